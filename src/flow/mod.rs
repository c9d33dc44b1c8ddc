//! Conversational intake flow: the stage machine, the composite session
//! state, the question walker, and the controller that ties them to the
//! question source, identity provider, and session store.

pub mod controller;
pub mod stage;
pub mod state;
pub mod walker;

pub use controller::{FlowController, Resumed, SignupFeedback, Summary};
pub use stage::Stage;
pub use state::FlowState;
pub use walker::{Progress, QuestionWalker};
