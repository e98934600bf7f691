//! Closed category types with a canonical toolkit string.
//!
//! Categories are passed to the toolkit as their string form, e.g. the
//! `vertex` in `nodeset 3 vertex 12`.

use std::fmt;

/// Geometry kinds known to the toolkit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryType {
    Vertex,
    Curve,
    Surface,
    Volume,
}

impl GeometryType {
    /// Classification order used by [`crate::Proxy::geometry_type`].
    pub const ALL: [GeometryType; 4] = [
        GeometryType::Vertex,
        GeometryType::Curve,
        GeometryType::Surface,
        GeometryType::Volume,
    ];

    /// The string that represents this item in toolkit commands.
    pub fn cubit_str(&self) -> &'static str {
        match self {
            GeometryType::Vertex => "vertex",
            GeometryType::Curve => "curve",
            GeometryType::Surface => "surface",
            GeometryType::Volume => "volume",
        }
    }

    /// Category name understood by the dispatcher's `isinstance` message.
    pub fn isinstance_name(&self) -> &'static str {
        match self {
            GeometryType::Vertex => "cubitpy_vertex",
            GeometryType::Curve => "cubitpy_curve",
            GeometryType::Surface => "cubitpy_surface",
            GeometryType::Volume => "cubitpy_volume",
        }
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cubit_str())
    }
}

/// Finite element objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FiniteElementObject {
    Hex,
    Tet,
    Face,
    Triangle,
    Edge,
    Node,
}

impl FiniteElementObject {
    pub fn cubit_str(&self) -> &'static str {
        match self {
            FiniteElementObject::Hex => "hex",
            FiniteElementObject::Tet => "tet",
            FiniteElementObject::Face => "face",
            FiniteElementObject::Triangle => "tri",
            FiniteElementObject::Edge => "edge",
            FiniteElementObject::Node => "node",
        }
    }
}

impl fmt::Display for FiniteElementObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cubit_str())
    }
}

/// Any value that crosses the wire as its canonical string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Geometry(GeometryType),
    Element(FiniteElementObject),
}

impl Category {
    pub fn cubit_str(&self) -> &'static str {
        match self {
            Category::Geometry(geometry) => geometry.cubit_str(),
            Category::Element(element) => element.cubit_str(),
        }
    }
}

impl From<GeometryType> for Category {
    fn from(geometry: GeometryType) -> Self {
        Category::Geometry(geometry)
    }
}

impl From<FiniteElementObject> for Category {
    fn from(element: FiniteElementObject) -> Self {
        Category::Element(element)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cubit_str())
    }
}
