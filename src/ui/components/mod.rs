mod command_input;
mod confirm;
mod input;
mod key_result;
mod prompt;

pub use command_input::{CommandEvent, CommandInput};
pub use confirm::{Confirm, ConfirmEvent};
pub use input::{InputResult, TextInput};
pub use key_result::KeyResult;
pub use prompt::{Prompt, PromptEvent};
