pub mod terrain_pass;
