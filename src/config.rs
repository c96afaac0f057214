// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

/// Tuning knobs for leaf fattening.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TreeConfig {
    /// Added on every side of an exact box to form the stored fat box.
    pub fat_margin: f32,

    /// Scale applied to the displacement passed to
    /// [`crate::DynamicTree::update_with_displacement`] before the fat box is
    /// stretched along it.
    pub displacement_multiplier: f32,
}

impl TreeConfig {
    pub const DEFAULT_FAT_MARGIN: f32 = 0.1;
    pub const DEFAULT_DISPLACEMENT_MULTIPLIER: f32 = 2.0;

    #[must_use]
    pub const fn new() -> Self {
        Self {
            fat_margin:              Self::DEFAULT_FAT_MARGIN,
            displacement_multiplier: Self::DEFAULT_DISPLACEMENT_MULTIPLIER,
        }
    }

    #[must_use]
    pub const fn with_fat_margin(
        mut self,
        fat_margin: f32,
    ) -> Self {
        self.fat_margin = fat_margin;
        self
    }

    #[must_use]
    pub const fn with_displacement_multiplier(
        mut self,
        displacement_multiplier: f32,
    ) -> Self {
        self.displacement_multiplier = displacement_multiplier;
        self
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self::new()
    }
}
