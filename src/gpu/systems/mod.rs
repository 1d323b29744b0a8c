// ============================================
// Systems Module - ECS-подобные системы
// ============================================

mod init_system;
mod input_system;
mod render_system;
mod update_system;

pub use init_system::InitSystem;
pub use input_system::{InputAction, InputSystem};
pub use render_system::RenderSystem;
pub use update_system::UpdateSystem;
