// ============================================
// Texture Registry - Текстуры по имени
// ============================================
// Вместо глобального синглтона: явный контекст, который передаётся
// в HeightField/DerivedMapGenerator/TerrainConfig.

use std::collections::HashMap;

use crate::gpu::error::{Result, TerrainError};
use super::backend::{ComputeBackend, TextureDesc, TextureHandle};

/// Реестр: имя -> дескриптор текстуры
#[derive(Default, Debug)]
pub struct TextureRegistry {
    by_name: HashMap<String, TextureHandle>,
}

impl TextureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Зарегистрировать имя. Повторная регистрация - ошибка.
    pub fn register(&mut self, name: &str, handle: TextureHandle) -> Result<()> {
        if self.by_name.contains_key(name) {
            return Err(TerrainError::AlreadyRegistered(name.to_string()));
        }
        self.by_name.insert(name.to_string(), handle);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<TextureHandle> {
        self.by_name.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// GPU контекст: backend + реестр текстур
pub struct GpuContext<B: ComputeBackend> {
    backend: B,
    textures: TextureRegistry,
}

impl<B: ComputeBackend> GpuContext<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            textures: TextureRegistry::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn textures(&self) -> &TextureRegistry {
        &self.textures
    }

    /// Найти текстуру по имени (без мутаций)
    pub fn get(&self, name: &str) -> Option<TextureHandle> {
        self.textures.get(name)
    }

    /// Вернуть существующую или создать и зарегистрировать новую
    pub fn get_or_create(&mut self, name: &str, desc: &TextureDesc) -> Result<TextureHandle> {
        if let Some(handle) = self.textures.get(name) {
            return Ok(handle);
        }
        self.create(name, desc)
    }

    /// Создать текстуру под новым именем. Имя должно быть свободно.
    pub fn create(&mut self, name: &str, desc: &TextureDesc) -> Result<TextureHandle> {
        if self.textures.contains(name) {
            return Err(TerrainError::AlreadyRegistered(name.to_string()));
        }
        let handle = self.backend.allocate_texture(desc)?;
        self.textures.register(name, handle)?;
        log::debug!("Registered texture '{}' -> {:?} ({}x{})", name, handle, desc.width, desc.height);
        Ok(handle)
    }

    /// Зарегистрировать уже выделенную текстуру под именем
    pub fn register(&mut self, name: &str, handle: TextureHandle) -> Result<()> {
        if self.backend.texture_desc(handle).is_none() {
            return Err(TerrainError::UnknownTexture(handle.id()));
        }
        self.textures.register(name, handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::compute::CpuBackend;

    #[test]
    fn test_get_or_create_returns_same_handle() {
        let mut ctx = GpuContext::new(CpuBackend::new());
        let a = ctx.get_or_create("albedo", &TextureDesc::derived_map(4)).unwrap();
        let b = ctx.get_or_create("albedo", &TextureDesc::derived_map(4)).unwrap();
        assert_eq!(a, b);
        assert_eq!(ctx.backend().texture_count(), 1);
    }

    #[test]
    fn test_create_twice_fails_without_allocating() {
        let mut ctx = GpuContext::new(CpuBackend::new());
        ctx.create("normalmap", &TextureDesc::derived_map(4)).unwrap();
        let second = ctx.create("normalmap", &TextureDesc::derived_map(4));
        assert!(matches!(second, Err(TerrainError::AlreadyRegistered(name)) if name == "normalmap"));
        assert_eq!(ctx.backend().texture_count(), 1);
    }

    #[test]
    fn test_register_existing_handle() {
        let mut ctx = GpuContext::new(CpuBackend::new());
        let handle = ctx.backend_mut().allocate_texture(&TextureDesc::heightmap(4)).unwrap();
        ctx.register("imported", handle).unwrap();
        assert_eq!(ctx.get("imported"), Some(handle));

        assert!(matches!(ctx.register("imported", handle), Err(TerrainError::AlreadyRegistered(_))));
        assert!(matches!(
            ctx.register("ghost", TextureHandle(9)),
            Err(TerrainError::UnknownTexture(9))
        ));
    }

    #[test]
    fn test_texture_count_follows_registrations() {
        let mut ctx = GpuContext::new(CpuBackend::new());
        assert!(ctx.textures().is_empty());
        ctx.create("heightmap", &TextureDesc::heightmap(4)).unwrap();
        ctx.get_or_create("normalmap", &TextureDesc::derived_map(4)).unwrap();
        ctx.get_or_create("normalmap", &TextureDesc::derived_map(4)).unwrap();
        let _ = ctx.create("heightmap", &TextureDesc::heightmap(4));
        assert_eq!(ctx.textures().len(), 2);
        assert_eq!(ctx.textures().len(), ctx.backend().texture_count());
    }

    #[test]
    fn test_allocation_failure_is_gpu_error() {
        let mut ctx = GpuContext::new(CpuBackend::new());
        let result = ctx.create("broken", &TextureDesc::derived_map(0));
        assert!(matches!(result, Err(TerrainError::GpuResource(_))));
        assert!(ctx.get("broken").is_none());
    }
}
