//! CLI command implementations.
//!
//! | Module     | Commands handled                              |
//! |------------|-----------------------------------------------|
//! | `pipeline` | `Provision`, `Stage`, `Build`, `Assemble`     |
//! | `launch`   | `Launch`                                      |
//! | `status`   | `Status`                                      |

pub mod launch;
pub mod pipeline;
pub mod status;

pub use launch::cmd_launch;
pub use pipeline::{cmd_assemble, cmd_build, cmd_provision, cmd_stage};
pub use status::cmd_status;
