use bevy::math::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Height and surface orientation queries the simulation makes of the ground.
pub trait TerrainSampler: Send + Sync {
    fn height(&self, position: Vec3) -> f32;

    /// Unit surface normal under `position`.
    fn normal(&self, position: Vec3) -> Vec3;

    /// `position` dropped onto the surface.
    fn project(&self, position: Vec3) -> Vec3 {
        Vec3::new(position.x, self.height(position), position.z)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlatTerrain {
    pub elevation: f32,
}

impl TerrainSampler for FlatTerrain {
    fn height(&self, _position: Vec3) -> f32 {
        self.elevation
    }

    fn normal(&self, _position: Vec3) -> Vec3 {
        Vec3::Y
    }
}

const LATTICE_OCTAVES: u32 = 4;

/// Row-major grid of heights in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct ElevationField {
    pub width: u32,
    pub height: u32,
    heights: Vec<f32>,
}

impl ElevationField {
    pub fn new(width: u32, height: u32, heights: Vec<f32>) -> Self {
        debug_assert_eq!(heights.len(), (width * height) as usize);
        Self {
            width,
            height,
            heights,
        }
    }

    /// Stacks random lattices, each twice as fine as the last and half as
    /// tall, then rescales the sum to `[0, 1]`.
    pub fn generate(width: u32, height: u32, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut heights = vec![0.0; (width * height) as usize];
        let mut spacing = (width.max(height) / 4).max(1);
        let mut amplitude = 1.0;
        for _ in 0..LATTICE_OCTAVES {
            let lattice_width = width / spacing + 2;
            let lattice_height = height / spacing + 2;
            let lattice = ElevationField::new(
                lattice_width,
                lattice_height,
                (0..lattice_width * lattice_height)
                    .map(|_| rng.gen::<f32>())
                    .collect(),
            );
            for (index, value) in heights.iter_mut().enumerate() {
                let x = index as u32 % width;
                let y = index as u32 / width;
                *value += amplitude
                    * lattice.sample_bilinear(x as f32 / spacing as f32, y as f32 / spacing as f32);
            }
            spacing = (spacing / 2).max(1);
            amplitude *= 0.5;
        }

        let (low, high) = heights
            .iter()
            .fold((f32::MAX, f32::MIN), |(low, high), h| (low.min(*h), high.max(*h)));
        let span = high - low;
        for h in &mut heights {
            *h = if span > f32::EPSILON { (*h - low) / span } else { 0.0 };
        }
        Self::new(width, height, heights)
    }

    pub fn at(&self, x: u32, y: u32) -> f32 {
        self.heights[(y * self.width + x) as usize]
    }

    /// Bilinear sample in grid units; coordinates are clamped to the field.
    pub fn sample_bilinear(&self, x: f32, y: f32) -> f32 {
        if self.width == 0 || self.height == 0 {
            return 0.0;
        }
        let x = x.clamp(0.0, (self.width - 1) as f32);
        let y = y.clamp(0.0, (self.height - 1) as f32);
        let (x0, y0) = (x.floor() as u32, y.floor() as u32);
        let (x1, y1) = ((x0 + 1).min(self.width - 1), (y0 + 1).min(self.height - 1));
        let (tx, ty) = (x - x0 as f32, y - y0 as f32);
        let near = self.at(x0, y0) + (self.at(x1, y0) - self.at(x0, y0)) * tx;
        let far = self.at(x0, y1) + (self.at(x1, y1) - self.at(x0, y1)) * tx;
        near + (far - near) * ty
    }
}

/// Elevation field laid over the XZ plane.
#[derive(Debug, Clone)]
pub struct HeightfieldTerrain {
    field: ElevationField,
    cell_size: f32,
    vertical_scale: f32,
}

impl HeightfieldTerrain {
    pub fn new(field: ElevationField, cell_size: f32, vertical_scale: f32) -> Self {
        Self {
            field,
            cell_size: cell_size.max(f32::EPSILON),
            vertical_scale,
        }
    }

    pub fn field(&self) -> &ElevationField {
        &self.field
    }

    /// World-space length of the field along X and Z.
    pub fn extent(&self) -> (f32, f32) {
        (
            self.field.width.saturating_sub(1) as f32 * self.cell_size,
            self.field.height.saturating_sub(1) as f32 * self.cell_size,
        )
    }
}

impl TerrainSampler for HeightfieldTerrain {
    fn height(&self, position: Vec3) -> f32 {
        self.field
            .sample_bilinear(position.x / self.cell_size, position.z / self.cell_size)
            * self.vertical_scale
    }

    fn normal(&self, position: Vec3) -> Vec3 {
        let step = self.cell_size;
        let left = self.height(position - Vec3::X * step);
        let right = self.height(position + Vec3::X * step);
        let back = self.height(position - Vec3::Z * step);
        let front = self.height(position + Vec3::Z * step);
        Vec3::new(left - right, 2.0 * step, back - front).normalize_or_zero()
    }
}
