//! Harvard-Oxford max-probability atlases (FSL).
//!
//! The cortical atlas keeps its native codes; the subcortical atlas is shifted
//! by [`SUBCORTICAL_OFFSET`] so both fit in one code space.

use std::sync::Arc;

use crate::error::ConfigurationError;
use crate::overlay::OverlayTarget;
use crate::registry::{LabelRegistry, RegistrySet};

pub const CORTICAL_NAMESPACE: &str = "harvard-oxford-cortical";
pub const SUBCORTICAL_NAMESPACE: &str = "harvard-oxford-subcortical";
pub const SUBCORTICAL_OFFSET: u32 = 1000;

pub const CORTICAL_REGIONS: [(u32, &str); 48] = [
    (1, "Frontal Pole"),
    (2, "Insular Cortex"),
    (3, "Superior Frontal Gyrus"),
    (4, "Middle Frontal Gyrus"),
    (5, "Inferior Frontal Gyrus, pars triangularis"),
    (6, "Inferior Frontal Gyrus, pars opercularis"),
    (7, "Precentral Gyrus"),
    (8, "Temporal Pole"),
    (9, "Superior Temporal Gyrus, anterior division"),
    (10, "Superior Temporal Gyrus, posterior division"),
    (11, "Middle Temporal Gyrus, anterior division"),
    (12, "Middle Temporal Gyrus, posterior division"),
    (13, "Middle Temporal Gyrus, temporooccipital part"),
    (14, "Inferior Temporal Gyrus, anterior division"),
    (15, "Inferior Temporal Gyrus, posterior division"),
    (16, "Inferior Temporal Gyrus, temporooccipital part"),
    (17, "Postcentral Gyrus"),
    (18, "Superior Parietal Lobule"),
    (19, "Supramarginal Gyrus, anterior division"),
    (20, "Supramarginal Gyrus, posterior division"),
    (21, "Angular Gyrus"),
    (22, "Lateral Occipital Cortex, superior division"),
    (23, "Lateral Occipital Cortex, inferior division"),
    (24, "Intracalcarine Cortex"),
    (25, "Frontal Medial Cortex"),
    (26, "Juxtapositional Lobule Cortex (formerly Supplementary Motor Cortex)"),
    (27, "Subcallosal Cortex"),
    (28, "Paracingulate Gyrus"),
    (29, "Cingulate Gyrus, anterior division"),
    (30, "Cingulate Gyrus, posterior division"),
    (31, "Precuneous Cortex"),
    (32, "Cuneal Cortex"),
    (33, "Frontal Orbital Cortex"),
    (34, "Parahippocampal Gyrus, anterior division"),
    (35, "Parahippocampal Gyrus, posterior division"),
    (36, "Lingual Gyrus"),
    (37, "Temporal Fusiform Cortex, anterior division"),
    (38, "Temporal Fusiform Cortex, posterior division"),
    (39, "Temporal Occipital Fusiform Cortex"),
    (40, "Occipital Fusiform Gyrus"),
    (41, "Frontal Operculum Cortex"),
    (42, "Central Opercular Cortex"),
    (43, "Parietal Operculum Cortex"),
    (44, "Planum Polare"),
    (45, "Heschl's Gyrus (includes H1 and H2)"),
    (46, "Planum Temporale"),
    (47, "Supracalcarine Cortex"),
    (48, "Occipital Pole"),
];

pub const SUBCORTICAL_REGIONS: [(u32, &str); 21] = [
    (1, "Left Cerebral White Matter"),
    (2, "Left Cerebral Cortex"),
    (3, "Left Lateral Ventricle"),
    (4, "Left Thalamus"),
    (5, "Left Caudate"),
    (6, "Left Putamen"),
    (7, "Left Pallidum"),
    (8, "Brain-Stem"),
    (9, "Left Hippocampus"),
    (10, "Left Amygdala"),
    (11, "Left Accumbens"),
    (12, "Right Cerebral White Matter"),
    (13, "Right Cerebral Cortex"),
    (14, "Right Lateral Ventricle"),
    (15, "Right Thalamus"),
    (16, "Right Caudate"),
    (17, "Right Putamen"),
    (18, "Right Pallidum"),
    (19, "Right Hippocampus"),
    (20, "Right Amygdala"),
    (21, "Right Accumbens"),
];

pub fn cortical_registry() -> Result<LabelRegistry, ConfigurationError> {
    Ok(LabelRegistry::new(CORTICAL_NAMESPACE, 0, CORTICAL_REGIONS)?.with_category("cortical"))
}

pub fn subcortical_registry() -> Result<LabelRegistry, ConfigurationError> {
    Ok(
        LabelRegistry::new(SUBCORTICAL_NAMESPACE, SUBCORTICAL_OFFSET, SUBCORTICAL_REGIONS)?
            .with_category("subcortical"),
    )
}

/// Both atlases merged.
pub fn registry_set() -> Result<RegistrySet, ConfigurationError> {
    RegistrySet::new(vec![
        Arc::new(cortical_registry()?),
        Arc::new(subcortical_registry()?),
    ])
}

/// Motor, sensory, frontal, memory and relay regions highlighted by default.
pub fn priority_targets() -> Vec<OverlayTarget> {
    let sub = |local: u32| SUBCORTICAL_OFFSET + local;
    vec![
        OverlayTarget::new(7, [255, 0, 0]),
        OverlayTarget::new(17, [0, 255, 0]),
        OverlayTarget::new(3, [0, 0, 255]),
        OverlayTarget::new(4, [255, 255, 0]),
        OverlayTarget::new(sub(9), [255, 0, 255]),
        OverlayTarget::new(sub(19), [255, 0, 255]),
        OverlayTarget::new(sub(10), [0, 255, 255]),
        OverlayTarget::new(sub(20), [0, 255, 255]),
        OverlayTarget::new(sub(5), [255, 128, 0]),
        OverlayTarget::new(sub(16), [255, 128, 0]),
        OverlayTarget::new(sub(6), [128, 255, 0]),
        OverlayTarget::new(sub(17), [128, 255, 0]),
        OverlayTarget::new(sub(4), [255, 0, 128]),
        OverlayTarget::new(sub(15), [255, 0, 128]),
    ]
}
