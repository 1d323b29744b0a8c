mod init;
mod state;

pub use init::{init_gpu, init_terrain, init_terrain_resources};
pub use state::{RendererState, TerrainResources};
