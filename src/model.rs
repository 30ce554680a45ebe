pub mod design;

pub use self::design::{DesignBounds, DesignVector};

use crate::error::{SizerError, SizerResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

pub type PropertyId = u32;
pub type ElementId = u32;
pub type MaterialId = u32;

/// Cross-section family of a property. The optimised dimension is `dim1` for
/// bars and the thickness for skins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PropertyKind {
    Bar { dim2: f64 },
    Skin,
}

impl PropertyKind {
    pub fn is_bar(&self) -> bool {
        matches!(self, PropertyKind::Bar { .. })
    }

    pub fn is_skin(&self) -> bool {
        matches!(self, PropertyKind::Skin)
    }

    pub fn label(&self) -> &'static str {
        match self {
            PropertyKind::Bar { .. } => "BAR",
            PropertyKind::Skin => "SKIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    #[serde(flatten)]
    pub kind: PropertyKind,
    /// Current value of the optimised dimension in the source model.
    pub value: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// Reference-design value used as the lower bound when floor locking is on.
    #[serde(default)]
    pub floor: Option<f64>,
    #[serde(default)]
    pub material: Option<MaterialId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub property: PropertyId,
    /// Area for shell elements, length for bar elements.
    pub measure: f64,
    pub centroid: [f64; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: MaterialId,
    pub density: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ModelDocument {
    properties: Vec<Property>,
    elements: Vec<Element>,
    #[serde(default)]
    materials: Vec<Material>,
}

/// Immutable base model: properties, elements and materials with lookup
/// indices built once at construction.
#[derive(Debug, Clone)]
pub struct StructuralModel {
    properties: Vec<Property>,
    elements: Vec<Element>,
    materials: Vec<Material>,
    property_index: BTreeMap<PropertyId, usize>,
    element_index: HashMap<ElementId, usize>,
    material_index: HashMap<MaterialId, usize>,
    elements_by_property: BTreeMap<PropertyId, Vec<usize>>,
}

impl StructuralModel {
    pub fn new(
        properties: Vec<Property>,
        elements: Vec<Element>,
        materials: Vec<Material>,
    ) -> SizerResult<Self> {
        let mut property_index = BTreeMap::new();
        for (idx, p) in properties.iter().enumerate() {
            if p.lower_bound.is_nan() || p.lower_bound <= 0.0 || p.upper_bound < p.lower_bound {
                return Err(SizerError::Validation(format!(
                    "Property {} has invalid bounds [{}, {}]",
                    p.id, p.lower_bound, p.upper_bound
                )));
            }
            if let PropertyKind::Bar { dim2 } = p.kind {
                if dim2.is_nan() || dim2 <= 0.0 {
                    return Err(SizerError::Validation(format!(
                        "Bar property {} has non-positive dim2 {}",
                        p.id, dim2
                    )));
                }
            }
            if property_index.insert(p.id, idx).is_some() {
                return Err(SizerError::Validation(format!(
                    "Duplicate property id {}",
                    p.id
                )));
            }
        }

        let mut element_index = HashMap::new();
        let mut elements_by_property: BTreeMap<PropertyId, Vec<usize>> = BTreeMap::new();
        for (idx, e) in elements.iter().enumerate() {
            if !property_index.contains_key(&e.property) {
                return Err(SizerError::Validation(format!(
                    "Element {} references unknown property {}",
                    e.id, e.property
                )));
            }
            if element_index.insert(e.id, idx).is_some() {
                return Err(SizerError::Validation(format!(
                    "Duplicate element id {}",
                    e.id
                )));
            }
            elements_by_property.entry(e.property).or_default().push(idx);
        }

        let mut material_index = HashMap::new();
        for (idx, m) in materials.iter().enumerate() {
            if material_index.insert(m.id, idx).is_some() {
                return Err(SizerError::Validation(format!(
                    "Duplicate material id {}",
                    m.id
                )));
            }
        }

        Ok(Self {
            properties,
            elements,
            materials,
            property_index,
            element_index,
            material_index,
            elements_by_property,
        })
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> SizerResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> SizerResult<Self> {
        let doc: ModelDocument = serde_json::from_str(content)?;
        Self::new(doc.properties, doc.elements, doc.materials)
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn property(&self, id: PropertyId) -> Option<&Property> {
        self.property_index.get(&id).map(|&i| &self.properties[i])
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.element_index.get(&id).map(|&i| &self.elements[i])
    }

    /// Elements owned by a property, in model order.
    pub fn elements_of(&self, id: PropertyId) -> impl Iterator<Item = &Element> {
        self.elements_by_property
            .get(&id)
            .into_iter()
            .flatten()
            .map(move |&i| &self.elements[i])
    }

    pub fn bar_properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter().filter(|p| p.kind.is_bar())
    }

    pub fn skin_properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter().filter(|p| p.kind.is_skin())
    }

    /// Density through the property's material, `None` when unresolved.
    pub fn density(&self, id: PropertyId) -> Option<f64> {
        let material = self.property(id)?.material?;
        self.material_index
            .get(&material)
            .map(|&i| self.materials[i].density)
    }

    /// Design vector holding each property's source-model value.
    pub fn initial_design(&self) -> DesignVector {
        self.properties.iter().map(|p| (p.id, p.value)).collect()
    }
}
