pub mod completion;
pub mod dates;
pub mod error;
pub mod generate;
pub mod instances;
pub mod plan_file;
pub mod reschedule;
pub mod scheduler;
pub mod store;

pub use error::{NotFoundKind, ScheduleError};
pub use generate::GenerationReport;
pub use reschedule::{CascadeFailure, RescheduleReport, RescheduleScope};
pub use scheduler::{Scheduler, SchedulerConfig};
