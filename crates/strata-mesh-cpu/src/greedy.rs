/// Fixed-capacity visited bitset for one mask, cleared per pass.
#[derive(Clone, Debug)]
pub struct VisitedBits {
    words: Vec<u64>,
}

impl VisitedBits {
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
        }
    }

    #[inline]
    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    #[inline]
    pub fn get(&self, i: usize) -> bool {
        self.words[i >> 6] & (1u64 << (i & 63)) != 0
    }

    #[inline]
    pub fn set(&mut self, i: usize) {
        self.words[i >> 6] |= 1u64 << (i & 63);
    }

    fn ensure(&mut self, len: usize) {
        let need = len.div_ceil(64);
        if self.words.len() < need {
            self.words.resize(need, 0);
        }
    }
}

/// Merges equal, non-`None` mask cells into maximal rectangles, row-major.
///
/// Emits `(u, v, w, h, key)` per rectangle. `visited` is cleared on entry.
pub fn greedy_rects<K: Copy + Eq>(
    width: usize,
    height: usize,
    mask: &[Option<K>],
    visited: &mut VisitedBits,
    mut emit: impl FnMut(usize, usize, usize, usize, K),
) {
    debug_assert_eq!(mask.len(), width * height);
    visited.ensure(width * height);
    visited.clear();
    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            let Some(key) = mask[idx] else {
                continue;
            };
            if visited.get(idx) {
                continue;
            }
            let mut w = 1;
            while x + w < width {
                let j = y * width + x + w;
                if mask[j] != Some(key) || visited.get(j) {
                    break;
                }
                w += 1;
            }
            let mut h = 1;
            'expand: while y + h < height {
                for i in 0..w {
                    let j = (y + h) * width + (x + i);
                    if mask[j] != Some(key) || visited.get(j) {
                        break 'expand;
                    }
                }
                h += 1;
            }
            emit(x, y, w, h, key);
            for yy in 0..h {
                for xx in 0..w {
                    visited.set((y + yy) * width + (x + xx));
                }
            }
        }
    }
}
