/// Question suppliers feeding trivia rounds.
pub mod questions;
