pub mod poll;
pub mod scopes;
pub mod visibility;
