//! Named kernel inputs (the dispatch's "uniforms").

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::{Mat4, Vec4};

use super::texture::{Texture2D, Texture3D};
use crate::util::{Error, Result};

/// A single bound input value.
#[derive(Clone, Debug)]
pub enum Binding {
    Int(i64),
    Float(f32),
    FloatArray(Arc<[f32]>),
    Vec4Array(Arc<[Vec4]>),
    Mat4Array(Arc<[Mat4]>),
    Texture2D(Arc<Texture2D>),
    Texture3DArray(Arc<[Texture3D]>),
}

impl Binding {
    fn kind(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::FloatArray(_) => "float[]",
            Self::Vec4Array(_) => "vec4[]",
            Self::Mat4Array(_) => "mat4[]",
            Self::Texture2D(_) => "sampler2D",
            Self::Texture3DArray(_) => "sampler3D[]",
        }
    }
}

/// Set of named inputs handed to a kernel at link time.
#[derive(Clone, Debug, Default)]
pub struct KernelInputs {
    bindings: BTreeMap<String, Binding>,
}

impl KernelInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value under `name`, replacing any previous binding.
    pub fn bind(mut self, name: &str, binding: Binding) -> Self {
        self.bindings.insert(name.to_string(), binding);
        self
    }

    pub fn int(self, name: &str, value: usize) -> Self {
        self.bind(name, Binding::Int(value as i64))
    }

    pub fn float(self, name: &str, value: f32) -> Self {
        self.bind(name, Binding::Float(value))
    }

    pub fn texture_2d(self, name: &str, texture: Texture2D) -> Self {
        self.bind(name, Binding::Texture2D(Arc::new(texture)))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    fn lookup(&self, name: &str) -> Result<&Binding> {
        self.bindings
            .get(name)
            .ok_or_else(|| Error::device(format!("unbound kernel input '{name}'")))
    }

    fn mismatch(name: &str, expected: &str, got: &Binding) -> Error {
        Error::device(format!(
            "kernel input '{name}' is {}, expected {expected}",
            got.kind()
        ))
    }

    /// Resolve a non-negative integer input.
    pub fn get_usize(&self, name: &str) -> Result<usize> {
        match self.lookup(name)? {
            Binding::Int(v) if *v >= 0 => Ok(*v as usize),
            other => Err(Self::mismatch(name, "non-negative int", other)),
        }
    }

    pub fn get_float(&self, name: &str) -> Result<f32> {
        match self.lookup(name)? {
            Binding::Float(v) => Ok(*v),
            other => Err(Self::mismatch(name, "float", other)),
        }
    }

    pub fn get_floats(&self, name: &str) -> Result<&[f32]> {
        match self.lookup(name)? {
            Binding::FloatArray(v) => Ok(&v[..]),
            other => Err(Self::mismatch(name, "float[]", other)),
        }
    }

    pub fn get_vec4s(&self, name: &str) -> Result<&[Vec4]> {
        match self.lookup(name)? {
            Binding::Vec4Array(v) => Ok(&v[..]),
            other => Err(Self::mismatch(name, "vec4[]", other)),
        }
    }

    pub fn get_mat4s(&self, name: &str) -> Result<&[Mat4]> {
        match self.lookup(name)? {
            Binding::Mat4Array(v) => Ok(&v[..]),
            other => Err(Self::mismatch(name, "mat4[]", other)),
        }
    }

    pub fn get_texture_2d(&self, name: &str) -> Result<&Texture2D> {
        match self.lookup(name)? {
            Binding::Texture2D(t) => Ok(t.as_ref()),
            other => Err(Self::mismatch(name, "sampler2D", other)),
        }
    }

    pub fn get_textures_3d(&self, name: &str) -> Result<&[Texture3D]> {
        match self.lookup(name)? {
            Binding::Texture3DArray(t) => Ok(&t[..]),
            other => Err(Self::mismatch(name, "sampler3D[]", other)),
        }
    }
}
