//! Scatter/gather job-list access engine.
//!
//! Firmware scatters the fields a peripheral consumes (length headers, associated data,
//! payloads, key lists) across independent buffers and describes them with a job list. This
//! module flattens such a list into a single byte stream:
//! 1. **Job entries:** 8-byte records `{pointer, length[23:0] | attribute[31:24]}` terminated by
//!    a null pointer.
//! 2. **Cursor:** Tracks the current entry, its remaining bytes and attribute, and the direction
//!    the list is being traversed in.
//! 3. **Field boundaries:** A transfer that would cross into a job with a different attribute
//!    stops early, so peripherals see where one logical field ends and the next begins.

use std::fmt;

use thiserror::Error;

use crate::common::BusFault;
use crate::soc::traits::DmaBus;

/// Size in bytes of one job entry in firmware memory.
pub const JOB_ENTRY_SIZE: usize = 8;

/// Largest length a job entry can describe (24 bits).
pub const MAX_JOB_LENGTH: u32 = 0x00FF_FFFF;

/// One scatter/gather descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobEntry {
    /// Buffer address; zero terminates the list.
    pub ptr: u32,
    /// Buffer length in bytes (24 bits).
    pub length: u32,
    /// Field tag; a change of tag marks a field boundary.
    pub attribute: u8,
}

impl JobEntry {
    /// Creates an entry, truncating `length` to 24 bits.
    pub const fn new(ptr: u32, length: u32, attribute: u8) -> Self {
        Self {
            ptr,
            length: length & MAX_JOB_LENGTH,
            attribute,
        }
    }

    /// The null entry that terminates a job list.
    pub const fn terminator() -> Self {
        Self::new(0, 0, 0)
    }

    /// Returns `true` for the list terminator.
    pub const fn is_terminator(&self) -> bool {
        self.ptr == 0
    }

    /// Decodes an entry from its in-memory representation.
    pub fn from_bytes(raw: [u8; JOB_ENTRY_SIZE]) -> Self {
        let ptr = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
        let word = u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]);
        Self {
            ptr,
            length: word & MAX_JOB_LENGTH,
            attribute: (word >> 24) as u8,
        }
    }

    /// Encodes the entry into its in-memory representation.
    pub fn to_bytes(&self) -> [u8; JOB_ENTRY_SIZE] {
        let word = (u32::from(self.attribute) << 24) | (self.length & MAX_JOB_LENGTH);
        let mut raw = [0u8; JOB_ENTRY_SIZE];
        raw[..4].copy_from_slice(&self.ptr.to_le_bytes());
        raw[4..].copy_from_slice(&word.to_le_bytes());
        raw
    }
}

/// Direction of a job-list traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Job-list memory to peripheral.
    Read,
    /// Peripheral to job-list memory.
    Write,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "input"),
            Self::Write => write!(f, "output"),
        }
    }
}

/// One transfer request: where the bytes come from or go to.
#[derive(Debug)]
pub enum Access<'a> {
    /// Fill the buffer from job-list memory.
    Read(&'a mut [u8]),
    /// Copy the buffer into job-list memory.
    Write(&'a [u8]),
}

impl Access<'_> {
    /// Direction implied by the request.
    pub const fn direction(&self) -> Direction {
        match self {
            Self::Read(_) => Direction::Read,
            Self::Write(_) => Direction::Write,
        }
    }

    /// Requested byte count.
    pub const fn len(&self) -> usize {
        match self {
            Self::Read(buf) => buf.len(),
            Self::Write(buf) => buf.len(),
        }
    }

    /// Returns `true` for a zero-byte request.
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Access engine failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DmaError {
    /// `access` was called before `start`.
    #[error("job list not started")]
    NotStarted,
    /// `start` was given a null job-list pointer.
    #[error("null job-list pointer")]
    NullJobList,
    /// The list holds no further job entries.
    #[error("end of job list")]
    EndOfList,
    /// The cursor was used in both directions without being restarted.
    #[error("{requested} access on a job list being traversed for {active}")]
    DirectionMismatch {
        /// Direction latched by the first access.
        active: Direction,
        /// Direction of the rejected access.
        requested: Direction,
    },
    /// A job entry or a job buffer lies outside mapped memory.
    #[error(transparent)]
    BusFault(#[from] BusFault),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActiveJob {
    ptr: u32,
    remaining: u32,
    attribute: u8,
    /// Set once any byte of the job has moved.
    consumed: bool,
}

/// Cursor over one job list.
#[derive(Debug, Clone, Default)]
pub struct JobCursor {
    /// Address of the next entry to load, `None` until started.
    next_entry: Option<u32>,
    current: Option<ActiveJob>,
    mode: Option<Direction>,
    exhausted: bool,
}

impl JobCursor {
    /// Creates an idle cursor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Points the cursor at the first entry of a job list.
    ///
    /// # Errors
    ///
    /// Returns [`DmaError::NullJobList`] for a null pointer; the cursor is left untouched.
    pub fn start(&mut self, job_list: u32) -> Result<(), DmaError> {
        if job_list == 0 {
            return Err(DmaError::NullJobList);
        }
        *self = Self {
            next_entry: Some(job_list),
            ..Self::default()
        };
        Ok(())
    }

    /// Direction latched by the first access since `start`, if any.
    pub const fn mode(&self) -> Option<Direction> {
        self.mode
    }

    /// Returns `true` once the terminator has been reached.
    pub const fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Attribute of the job the cursor currently sits in.
    pub fn current_attribute(&self) -> Option<u8> {
        self.current.map(|job| job.attribute)
    }

    /// Moves bytes between job-list memory and the request buffer.
    ///
    /// `start_new_job` discards whatever is left of a partly consumed job before transferring,
    /// so logically distinct fields can be read from separate entries. A job loaded at a field
    /// boundary but not yet touched is kept: it is the start of the next field.
    ///
    /// # Returns
    ///
    /// The number of bytes moved. This is the full request unless the next job carries a
    /// different attribute or the list ends part way, in which case it is the partial count.
    ///
    /// # Errors
    ///
    /// * [`DmaError::EndOfList`] - nothing was transferred because the list is exhausted.
    /// * [`DmaError::BusFault`] - a job entry or buffer is unmapped.
    /// * [`DmaError::DirectionMismatch`] - the cursor was latched to the other direction.
    /// * [`DmaError::NotStarted`] - `start` was never called.
    pub fn access(
        &mut self,
        bus: &mut dyn DmaBus,
        mut request: Access<'_>,
        start_new_job: bool,
    ) -> Result<usize, DmaError> {
        if self.next_entry.is_none() {
            return Err(DmaError::NotStarted);
        }
        let requested = request.direction();
        match self.mode {
            Some(active) if active != requested => {
                tracing::error!(
                    %active,
                    %requested,
                    "job list direction switched mid-traversal"
                );
                return Err(DmaError::DirectionMismatch { active, requested });
            }
            _ => self.mode = Some(requested),
        }
        if start_new_job && self.current.is_some_and(|job| job.consumed) {
            self.current = None;
        }

        let len = request.len();
        let mut done = 0usize;
        while done < len {
            let job = if let Some(job) = self.current.filter(|j| j.remaining > 0) {
                job
            } else {
                let previous = self.current;
                let Some(next) = self.load_next(bus)? else {
                    break;
                };
                self.current = Some(next);
                if done > 0 && previous.is_some_and(|p| p.attribute != next.attribute) {
                    break;
                }
                next
            };

            let chunk = (job.remaining as usize).min(len - done);
            match &mut request {
                Access::Read(buf) => bus.read_bytes(job.ptr, &mut buf[done..done + chunk])?,
                Access::Write(data) => bus.write_bytes(job.ptr, &data[done..done + chunk])?,
            }
            self.current = Some(ActiveJob {
                ptr: job.ptr.wrapping_add(chunk as u32),
                remaining: job.remaining - chunk as u32,
                attribute: job.attribute,
                consumed: true,
            });
            done += chunk;
        }

        if done == 0 && len > 0 {
            return Err(DmaError::EndOfList);
        }
        Ok(done)
    }

    /// Reads up to `buf.len()` bytes; see [`JobCursor::access`].
    ///
    /// # Errors
    ///
    /// As for [`JobCursor::access`].
    pub fn read(
        &mut self,
        bus: &mut dyn DmaBus,
        buf: &mut [u8],
        start_new_job: bool,
    ) -> Result<usize, DmaError> {
        self.access(bus, Access::Read(buf), start_new_job)
    }

    /// Writes up to `data.len()` bytes; see [`JobCursor::access`].
    ///
    /// # Errors
    ///
    /// As for [`JobCursor::access`].
    pub fn write(
        &mut self,
        bus: &mut dyn DmaBus,
        data: &[u8],
        start_new_job: bool,
    ) -> Result<usize, DmaError> {
        self.access(bus, Access::Write(data), start_new_job)
    }

    /// Loads the next non-empty job, or `None` at the terminator.
    fn load_next(&mut self, bus: &mut dyn DmaBus) -> Result<Option<ActiveJob>, DmaError> {
        if self.exhausted {
            return Ok(None);
        }
        let Some(mut entry_addr) = self.next_entry else {
            return Err(DmaError::NotStarted);
        };
        loop {
            let mut raw = [0u8; JOB_ENTRY_SIZE];
            bus.read_bytes(entry_addr, &mut raw)?;
            let entry = JobEntry::from_bytes(raw);
            if entry.is_terminator() {
                self.exhausted = true;
                self.next_entry = Some(entry_addr);
                return Ok(None);
            }
            entry_addr = entry_addr.wrapping_add(JOB_ENTRY_SIZE as u32);
            self.next_entry = Some(entry_addr);
            if entry.length == 0 {
                continue;
            }
            return Ok(Some(ActiveJob {
                ptr: entry.ptr,
                remaining: entry.length,
                attribute: entry.attribute,
                consumed: false,
            }));
        }
    }
}
