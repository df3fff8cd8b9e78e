//! Label code -> region name tables.
//!
//! Codes stored in a label volume are local to the registry that volume was
//! built against. Each registry carries a namespace offset so that codes from
//! several atlases can live side by side in one global code space.

use std::collections::BTreeMap;
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;

use crate::affine::Coordinate;
use crate::error::ConfigurationError;
use crate::volume::LabelVolume;

/// Immutable code table for one atlas.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelRegistry {
    namespace: String,
    category: String,
    offset: u32,
    regions: BTreeMap<u32, String>,
}

impl LabelRegistry {
    /// # Errors
    ///
    /// Rejects a repeated local code rather than letting the later entry
    /// overwrite the earlier one, the reserved code `0`, and codes that
    /// overflow once the offset is applied.
    pub fn new<S: Into<String>>(
        namespace: impl Into<String>,
        offset: u32,
        entries: impl IntoIterator<Item = (u32, S)>,
    ) -> Result<Self, ConfigurationError> {
        let namespace = namespace.into();
        let mut regions = BTreeMap::new();
        for (code, name) in entries {
            if code == 0 {
                return Err(ConfigurationError::ReservedCode(namespace));
            }
            if code.checked_add(offset).is_none() {
                return Err(ConfigurationError::CodeOverflow { namespace, code });
            }
            if regions.insert(code, name.into()).is_some() {
                return Err(ConfigurationError::DuplicateCode { namespace, code });
            }
        }
        Ok(Self {
            category: namespace.clone(),
            namespace,
            offset,
            regions,
        })
    }

    /// Short family name used in exported region lists. Defaults to the
    /// namespace.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Name for a local code.
    pub fn name(&self, local: u32) -> Option<&str> {
        self.regions.get(&local).map(String::as_str)
    }

    pub fn global_code(&self, local: u32) -> u32 {
        local + self.offset
    }

    /// Local code for a global one, if it belongs to this registry.
    pub fn local_code(&self, global: u32) -> Option<u32> {
        let local = global.checked_sub(self.offset)?;
        self.regions.contains_key(&local).then_some(local)
    }

    /// `(global code, name)` pairs in ascending code order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        self.regions
            .iter()
            .map(|(&code, name)| (code + self.offset, name.as_str()))
    }
}

/// A region found at some coordinate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RegionHit {
    pub code: u32,
    pub name: String,
    pub namespace: String,
}

/// One entry of an exported region list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RegionEntry {
    pub id: u32,
    pub name: String,
    pub category: String,
    pub description: String,
}

/// Coordinate -> regions, keyed `"x,y,z"`. Points without a region are left
/// out.
pub type LookupTable = BTreeMap<String, Vec<RegionHit>>;

/// Inclusive integer grid of physical coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LookupGrid {
    pub min: [i32; 3],
    pub max: [i32; 3],
    pub step: i32,
}

impl LookupGrid {
    /// MNI152 bounding box at `step` mm.
    pub fn mni(step: i32) -> Self {
        Self {
            min: [-90, -126, -72],
            max: [90, 90, 108],
            step: step.max(1),
        }
    }

    /// Grid points, x slowest.
    pub fn points(&self) -> Vec<[i32; 3]> {
        let axis = |a: usize| -> Vec<i32> {
            (self.min[a]..=self.max[a])
                .step_by(self.step.max(1) as usize)
                .collect()
        };
        let (xs, ys, zs) = (axis(0), axis(1), axis(2));
        let mut points = Vec::with_capacity(xs.len() * ys.len() * zs.len());
        for &x in &xs {
            for &y in &ys {
                for &z in &zs {
                    points.push([x, y, z]);
                }
            }
        }
        points
    }
}

/// Several registries merged into one global code space.
#[derive(Clone, Debug, Default)]
pub struct RegistrySet {
    registries: Vec<Arc<LabelRegistry>>,
    owners: BTreeMap<u32, usize>,
}

impl RegistrySet {
    /// # Errors
    ///
    /// [`ConfigurationError::DuplicateNamespace`] if two registries share a
    /// namespace, [`ConfigurationError::NamespaceOverlap`] if their offset
    /// codes collide.
    pub fn new(registries: Vec<Arc<LabelRegistry>>) -> Result<Self, ConfigurationError> {
        let mut owners: BTreeMap<u32, usize> = BTreeMap::new();
        for (idx, registry) in registries.iter().enumerate() {
            if registries[..idx]
                .iter()
                .any(|r| r.namespace() == registry.namespace())
            {
                return Err(ConfigurationError::DuplicateNamespace(
                    registry.namespace().to_owned(),
                ));
            }
            for (code, _) in registry.iter() {
                if let Some(&prev) = owners.get(&code) {
                    return Err(ConfigurationError::NamespaceOverlap {
                        first: registries[prev].namespace().to_owned(),
                        second: registry.namespace().to_owned(),
                        code,
                    });
                }
                owners.insert(code, idx);
            }
        }
        Ok(Self { registries, owners })
    }

    /// Registry owning a global code, with the code translated to local.
    pub fn resolve(&self, global: u32) -> Option<(&Arc<LabelRegistry>, u32)> {
        let registry = &self.registries[*self.owners.get(&global)?];
        Some((registry, global - registry.offset()))
    }

    pub fn name(&self, global: u32) -> Option<&str> {
        let (registry, local) = self.resolve(global)?;
        registry.name(local)
    }

    /// Named regions covering `coord` in any of `layers`.
    pub fn regions_at(&self, coord: &Coordinate, layers: &[LabelVolume]) -> Vec<RegionHit> {
        layers
            .iter()
            .filter_map(|layer| {
                let local = layer.volume.value_at(coord).filter(|&c| c != 0)?;
                let name = layer.registry.name(local)?;
                Some(RegionHit {
                    code: layer.registry.global_code(local),
                    name: name.to_owned(),
                    namespace: layer.namespace().to_owned(),
                })
            })
            .collect()
    }

    /// Every region of every registry, in registry then code order.
    pub fn region_list(&self) -> Vec<RegionEntry> {
        self.registries
            .iter()
            .flat_map(|registry| {
                let label = capitalize(registry.category());
                registry.iter().map(move |(id, name)| RegionEntry {
                    id,
                    name: name.to_owned(),
                    category: registry.category().to_owned(),
                    description: format!("{label} region: {name}"),
                })
            })
            .collect()
    }

    /// Regions at every point of `grid` that hits at least one layer.
    pub fn lookup_table(&self, layers: &[LabelVolume], grid: &LookupGrid) -> LookupTable {
        grid.points()
            .into_par_iter()
            .filter_map(|[x, y, z]| {
                let coord = Coordinate::new(f64::from(x), f64::from(y), f64::from(z));
                let hits = self.regions_at(&coord, layers);
                (!hits.is_empty()).then(|| (format!("{x},{y},{z}"), hits))
            })
            .collect()
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
