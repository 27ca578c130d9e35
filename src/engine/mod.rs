pub mod assignment;
pub mod conflicts;
pub mod nearest;
pub mod selection;
