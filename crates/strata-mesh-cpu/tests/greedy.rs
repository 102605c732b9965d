use proptest::prelude::*;
use strata_mesh_cpu::{VisitedBits, greedy_rects};

fn run(width: usize, height: usize, mask: &[Option<u8>]) -> Vec<(usize, usize, usize, usize, u8)> {
    let mut visited = VisitedBits::new(width * height);
    let mut out = Vec::new();
    greedy_rects(width, height, mask, &mut visited, |x, y, w, h, k| out.push((x, y, w, h, k)));
    out
}

#[test]
fn uniform_mask_is_one_rect() {
    let mask = vec![Some(1u8); 16 * 16];
    assert_eq!(run(16, 16, &mask), vec![(0, 0, 16, 16, 1)]);
}

#[test]
fn empty_mask_emits_nothing() {
    assert!(run(4, 4, &[None; 16]).is_empty());
}

#[test]
fn width_then_height() {
    // 1 1 0
    // 1 1 1
    let mask = [Some(1u8), Some(1), None, Some(1), Some(1), Some(1)];
    assert_eq!(run(3, 2, &mask), vec![(0, 0, 2, 2, 1), (2, 1, 1, 1, 1)]);
}

#[test]
fn visited_bits_are_cleared_between_calls() {
    let mask = vec![Some(3u8); 9];
    let mut visited = VisitedBits::new(9);
    for _ in 0..2 {
        let mut n = 0;
        greedy_rects(3, 3, &mask, &mut visited, |_, _, _, _, _| n += 1);
        assert_eq!(n, 1);
    }
}

proptest! {
    #[test]
    fn rects_tile_the_mask_exactly(cells in prop::collection::vec(prop::option::of(0u8..3), 16 * 16)) {
        let rects = run(16, 16, &cells);
        let mut cover = vec![0u8; 16 * 16];
        for (x, y, w, h, k) in rects {
            for yy in y..y + h {
                for xx in x..x + w {
                    let i = yy * 16 + xx;
                    prop_assert_eq!(cells[i], Some(k));
                    cover[i] += 1;
                }
            }
        }
        for (i, c) in cells.iter().enumerate() {
            prop_assert_eq!(cover[i], u8::from(c.is_some()));
        }
    }
}
