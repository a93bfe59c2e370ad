pub mod attack;
pub mod bonus;
pub mod dice;
pub mod presets;
