pub mod detect;
pub mod engine;
pub mod wizard;

pub use detect::{contains_link, detect_violation, LINK_MARKERS};
pub use engine::{ModerationEngine, Outcome, WARN_LIMIT};
pub use wizard::{Wizard, WizardReply};
