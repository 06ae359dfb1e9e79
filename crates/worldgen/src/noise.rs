//! Hash-based gradient noise and fractal sums.
//!
//! All functions here are pure and bit-reproducible for a given seed. The
//! integer hash doubles as the source for every "pseudo-random" decision in
//! the generator (gradient selection, ore masks, tree jitter), so nothing
//! anywhere depends on a stateful RNG.

/// FNV-1a-style mix of three coordinates and a seed.
///
/// Folding each axis through the FNV prime keeps permuted inputs from
/// colliding (hash(x,y,z) != hash(z,y,x) in general).
#[inline]
pub fn fast_hash(x: i32, y: i32, z: i32, seed: u32) -> i32 {
    let mut h = 0x811c_9dc5u32 ^ seed;
    for v in [x as u32, y as u32, z as u32] {
        h ^= v;
        h = h.wrapping_mul(0x0100_0193);
        h ^= h >> 15;
    }
    h as i32
}

/// Hash mapped to `[0, 1)`.
#[inline]
pub fn hash_unit(x: i32, y: i32, z: i32, seed: u32) -> f32 {
    // Top 24 bits so the f32 mantissa holds the value exactly.
    ((fast_hash(x, y, z, seed) as u32) >> 8) as f32 / 16_777_216.0
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
pub fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

const GRAD2: [(f32, f32); 8] = [
    (1.0, 0.0),
    (-1.0, 0.0),
    (0.0, 1.0),
    (0.0, -1.0),
    (std::f32::consts::FRAC_1_SQRT_2, std::f32::consts::FRAC_1_SQRT_2),
    (-std::f32::consts::FRAC_1_SQRT_2, std::f32::consts::FRAC_1_SQRT_2),
    (std::f32::consts::FRAC_1_SQRT_2, -std::f32::consts::FRAC_1_SQRT_2),
    (-std::f32::consts::FRAC_1_SQRT_2, -std::f32::consts::FRAC_1_SQRT_2),
];

// The twelve edge directions of a cube, the classic 3-D gradient set.
const GRAD3: [(f32, f32, f32); 12] = [
    (1.0, 1.0, 0.0),
    (-1.0, 1.0, 0.0),
    (1.0, -1.0, 0.0),
    (-1.0, -1.0, 0.0),
    (1.0, 0.0, 1.0),
    (-1.0, 0.0, 1.0),
    (1.0, 0.0, -1.0),
    (-1.0, 0.0, -1.0),
    (0.0, 1.0, 1.0),
    (0.0, -1.0, 1.0),
    (0.0, 1.0, -1.0),
    (0.0, -1.0, -1.0),
];

#[inline]
fn corner_dot_2d(cx: i32, cz: i32, dx: f32, dz: f32, seed: u32) -> f32 {
    let (gx, gz) = GRAD2[(fast_hash(cx, 0, cz, seed) & 7) as usize];
    gx * dx + gz * dz
}

/// 2-D gradient noise in `[-1, 1]`.
pub fn gradient_noise_2d(x: f32, z: f32, seed: u32) -> f32 {
    let xi = x.floor() as i32;
    let zi = z.floor() as i32;
    let xf = x - xi as f32;
    let zf = z - zi as f32;

    let u = smoothstep(xf);
    let v = smoothstep(zf);

    let n00 = corner_dot_2d(xi, zi, xf, zf, seed);
    let n10 = corner_dot_2d(xi + 1, zi, xf - 1.0, zf, seed);
    let n01 = corner_dot_2d(xi, zi + 1, xf, zf - 1.0, seed);
    let n11 = corner_dot_2d(xi + 1, zi + 1, xf - 1.0, zf - 1.0, seed);

    let a = lerp(n00, n10, u);
    let b = lerp(n01, n11, u);
    (lerp(a, b, v) * std::f32::consts::SQRT_2).clamp(-1.0, 1.0)
}

#[inline]
fn corner_dot_3d(cx: i32, cy: i32, cz: i32, dx: f32, dy: f32, dz: f32, seed: u32) -> f32 {
    let h = (fast_hash(cx, cy, cz, seed) as u32 % 12) as usize;
    let (gx, gy, gz) = GRAD3[h];
    gx * dx + gy * dy + gz * dz
}

/// 3-D gradient noise in `[-1, 1]`.
pub fn gradient_noise_3d(x: f32, y: f32, z: f32, seed: u32) -> f32 {
    let xi = x.floor() as i32;
    let yi = y.floor() as i32;
    let zi = z.floor() as i32;
    let xf = x - xi as f32;
    let yf = y - yi as f32;
    let zf = z - zi as f32;

    let u = smoothstep(xf);
    let v = smoothstep(yf);
    let w = smoothstep(zf);

    let mut corners = [0.0f32; 8];
    for (i, corner) in corners.iter_mut().enumerate() {
        let ox = (i & 1) as i32;
        let oy = ((i >> 1) & 1) as i32;
        let oz = ((i >> 2) & 1) as i32;
        *corner = corner_dot_3d(
            xi + ox,
            yi + oy,
            zi + oz,
            xf - ox as f32,
            yf - oy as f32,
            zf - oz as f32,
            seed,
        );
    }

    let x0 = lerp(corners[0], corners[1], u);
    let x1 = lerp(corners[2], corners[3], u);
    let x2 = lerp(corners[4], corners[5], u);
    let x3 = lerp(corners[6], corners[7], u);
    let y0 = lerp(x0, x1, v);
    let y1 = lerp(x2, x3, v);
    (lerp(y0, y1, w) * 1.154_700_5).clamp(-1.0, 1.0)
}

/// Fractal Brownian motion over 2-D gradient noise, mapped to `[0, 1]`.
pub fn fbm_2d(
    x: f32,
    z: f32,
    octaves: u32,
    lacunarity: f32,
    gain: f32,
    base_freq: f32,
    seed: u32,
) -> f32 {
    let mut freq = base_freq;
    let mut amp = 1.0;
    let mut sum = 0.0;
    let mut total = 0.0;
    for octave in 0..octaves {
        sum += gradient_noise_2d(x * freq, z * freq, seed.wrapping_add(octave * 0x9e37)) * amp;
        total += amp;
        freq *= lacunarity;
        amp *= gain;
    }
    ((sum / total + 1.0) * 0.5).clamp(0.0, 1.0)
}

/// Ridged FBM in `[0, 1]`: inverted-absolute-value octaves with a weight that
/// decays where the previous octave was flat, which sharpens crest lines.
pub fn ridged_fbm_2d(
    x: f32,
    z: f32,
    octaves: u32,
    lacunarity: f32,
    gain: f32,
    base_freq: f32,
    seed: u32,
) -> f32 {
    let mut freq = base_freq;
    let mut amp = 1.0;
    let mut weight = 1.0;
    let mut sum = 0.0;
    let mut total = 0.0;
    for octave in 0..octaves {
        let n = gradient_noise_2d(x * freq, z * freq, seed.wrapping_add(octave * 0x7f4a));
        let mut ridge = 1.0 - n.abs();
        ridge *= ridge;
        ridge *= weight;
        weight = (ridge * 2.0).clamp(0.0, 1.0);
        sum += ridge * amp;
        total += amp;
        freq *= lacunarity;
        amp *= gain;
    }
    (sum / total).clamp(0.0, 1.0)
}

/// Fractal Brownian motion over 3-D gradient noise, mapped to `[0, 1]`.
pub fn fbm_3d(
    x: f32,
    y: f32,
    z: f32,
    octaves: u32,
    lacunarity: f32,
    gain: f32,
    base_freq: f32,
    seed: u32,
) -> f32 {
    let mut freq = base_freq;
    let mut amp = 1.0;
    let mut sum = 0.0;
    let mut total = 0.0;
    for octave in 0..octaves {
        sum += gradient_noise_3d(
            x * freq,
            y * freq,
            z * freq,
            seed.wrapping_add(octave * 0x9e37),
        ) * amp;
        total += amp;
        freq *= lacunarity;
        amp *= gain;
    }
    ((sum / total + 1.0) * 0.5).clamp(0.0, 1.0)
}
