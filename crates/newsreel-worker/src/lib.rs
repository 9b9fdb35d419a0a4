//! Background jobs: the transcoding sweep that drains pending videos and the
//! expiry sweep that reclaims abandoned chunked uploads.
//!
//! Both run on the [`Scheduler`], a small fixed-interval job runner owned by
//! the API binary. Jobs are shut down together via [`Scheduler::stop`].

pub mod expiry;
pub mod prober;
pub mod scheduler;
pub mod transcode;

pub use expiry::SessionExpirySweep;
pub use prober::{FfprobeProber, VideoProber};
pub use scheduler::{Job, Scheduler};
pub use transcode::TranscodeSweep;
