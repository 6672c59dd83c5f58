pub mod info;
pub mod remotes;
pub mod stage;
pub mod status;
pub mod update;

pub use info::*;
pub use remotes::*;
pub use stage::*;
pub use status::*;
pub use update::*;
