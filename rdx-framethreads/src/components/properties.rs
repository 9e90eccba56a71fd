//! Per-thread scratch storage.
//!
//! A [`Properties`] map stores one [`Property`] per string key. Lookups never
//! fail: a missing key yields [`Property::None`], whose typed views all return
//! the zero value of their type. Keys never expire on their own; the whole map
//! is cleared when a thread is restarted completely.

use std::collections::HashMap;

/// A two-component vector.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A three-component vector.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// A rotation quaternion, stored as `(x, y, z, w)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quat {
    /// The identity rotation (`[0, 0, 0, 1]`).
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    pub const fn from_xyzw(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// Fully transparent black (`[0, 0, 0, 0]`).
    pub const CLEAR: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    /// Opaque white.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

/// A dynamically-typed scratch value.
///
/// Each `as_*` view returns the payload when the variant matches and the
/// type's zero value otherwise, including for [`Property::None`]:
/// `false`, `0`, `0.0`, `None` for strings, [`Vec2::ZERO`], [`Vec3::ZERO`],
/// [`Quat::IDENTITY`] and [`Color::CLEAR`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Property {
    #[default]
    None,
    Bool(bool),
    Int(i32),
    Float(f32),
    String(String),
    Vector2(Vec2),
    Vector3(Vec3),
    Quaternion(Quat),
    Color(Color),
}

impl Property {
    pub fn is_none(&self) -> bool {
        matches!(self, Property::None)
    }

    pub fn as_bool(&self) -> bool {
        match self {
            Property::Bool(value) => *value,
            _ => false,
        }
    }

    pub fn as_int(&self) -> i32 {
        match self {
            Property::Int(value) => *value,
            _ => 0,
        }
    }

    pub fn as_float(&self) -> f32 {
        match self {
            Property::Float(value) => *value,
            _ => 0.0,
        }
    }

    /// The string payload, or `None` for any other variant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Property::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_vec2(&self) -> Vec2 {
        match self {
            Property::Vector2(value) => *value,
            _ => Vec2::ZERO,
        }
    }

    pub fn as_vec3(&self) -> Vec3 {
        match self {
            Property::Vector3(value) => *value,
            _ => Vec3::ZERO,
        }
    }

    pub fn as_quat(&self) -> Quat {
        match self {
            Property::Quaternion(value) => *value,
            _ => Quat::IDENTITY,
        }
    }

    pub fn as_color(&self) -> Color {
        match self {
            Property::Color(value) => *value,
            _ => Color::CLEAR,
        }
    }

    /// Short name of the variant, for display.
    pub fn kind(&self) -> &'static str {
        match self {
            Property::None => "none",
            Property::Bool(_) => "bool",
            Property::Int(_) => "int",
            Property::Float(_) => "float",
            Property::String(_) => "string",
            Property::Vector2(_) => "vector2",
            Property::Vector3(_) => "vector3",
            Property::Quaternion(_) => "quaternion",
            Property::Color(_) => "color",
        }
    }
}

impl From<bool> for Property {
    fn from(value: bool) -> Self {
        Property::Bool(value)
    }
}

impl From<i32> for Property {
    fn from(value: i32) -> Self {
        Property::Int(value)
    }
}

impl From<f32> for Property {
    fn from(value: f32) -> Self {
        Property::Float(value)
    }
}

impl From<String> for Property {
    fn from(value: String) -> Self {
        Property::String(value)
    }
}

impl From<&str> for Property {
    fn from(value: &str) -> Self {
        Property::String(value.to_string())
    }
}

impl From<Vec2> for Property {
    fn from(value: Vec2) -> Self {
        Property::Vector2(value)
    }
}

impl From<Vec3> for Property {
    fn from(value: Vec3) -> Self {
        Property::Vector3(value)
    }
}

impl From<Quat> for Property {
    fn from(value: Quat) -> Self {
        Property::Quaternion(value)
    }
}

impl From<Color> for Property {
    fn from(value: Color) -> Self {
        Property::Color(value)
    }
}

static EMPTY: Property = Property::None;

/// String-keyed scratch storage owned by one thread.
#[derive(Debug, Clone, Default)]
pub struct Properties {
    values: HashMap<String, Property>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored value, or the shared empty value when `key` is absent.
    pub fn get(&self, key: &str) -> &Property {
        self.values.get(key).unwrap_or(&EMPTY)
    }

    /// Inserts or overwrites `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Property>) {
        self.values.insert(key.into(), value.into());
    }

    /// Removes `key`. Returns `false` when it was not present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Property)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }
}
