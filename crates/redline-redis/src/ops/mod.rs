//! Operation surface of the manager.
//!
//! The data-structure families are one-to-one adapters over the store's
//! command set; every method runs through the manager's gate/classify
//! path and differs only in the command it builds and the type it
//! decodes. `scripting` holds the atomic primitives, `pipeline` the
//! batched builder.

mod bitmaps;
mod hashes;
mod keys;
mod lists;
mod pipeline;
mod scripting;
mod sets;
mod strings;
mod zsets;

pub use pipeline::CommandBatch;
pub use scripting::CounterUpdate;
