//! Feature modules of the console bot.

pub mod ask;
pub mod general;
pub mod notes;

#[cfg(test)]
mod testing;

pub use ask::AskModule;
pub use general::GeneralModule;
pub use notes::NotesModule;

use ferrule::framework::BoxedModule;

/// The demo's own modules, registered after the built-in ones.
pub fn demo_modules() -> Vec<BoxedModule> {
    vec![
        Box::new(GeneralModule),
        Box::new(NotesModule),
        Box::new(AskModule),
    ]
}
