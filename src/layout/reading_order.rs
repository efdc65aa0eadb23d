//! Reading-order resolution by recursive XY-cut.
//!
//! A region is first split at its widest vertical gutter (columns, left
//! before right). Without a gutter it is split at the widest whitespace
//! between horizontal bands (upper before lower). A single band with no
//! gutter is read left to right. Every comparison falls back to extraction
//! order, so the result depends only on the fragment set.

use std::cmp::Ordering;

use crate::model::{Fragment, PageStream};

use super::LayoutConfig;

/// Put the fragments of one page into reading order.
pub fn resolve_page(mut page: PageStream, config: &LayoutConfig) -> PageStream {
    let finite = page.has_finite_geometry();
    let fragments = std::mem::take(&mut page.fragments);
    page.fragments = if finite {
        order_fragments(fragments, page.width, config)
    } else {
        log::debug!(
            "page {}: non-finite geometry, keeping extraction order",
            page.number
        );
        extraction_order(fragments)
    };
    page
}

/// Order fragments using a page of the given width.
pub fn order_fragments(fragments: Vec<Fragment>, page_width: f32, config: &LayoutConfig) -> Vec<Fragment> {
    if fragments.len() < 2 {
        return fragments;
    }
    let min_gutter = config.column_gap_fraction * page_width;
    let items: Vec<usize> = (0..fragments.len()).collect();
    let mut order = Vec::with_capacity(fragments.len());
    xy_cut(items, &fragments, min_gutter, config.line_tolerance, &mut order);

    let mut slots: Vec<Option<Fragment>> = fragments.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect()
}

fn extraction_order(mut fragments: Vec<Fragment>) -> Vec<Fragment> {
    fragments.sort_by_key(|f| f.id);
    fragments
}

fn xy_cut(
    mut items: Vec<usize>,
    frags: &[Fragment],
    min_gutter: f32,
    tolerance: f32,
    out: &mut Vec<usize>,
) {
    if items.len() <= 1 {
        out.extend(items);
        return;
    }

    if let Some(split) = find_gutter(&items, frags, min_gutter) {
        log::trace!("gutter at x={:.1} over {} fragments", split, items.len());
        let (left, right): (Vec<usize>, Vec<usize>) =
            items.into_iter().partition(|&i| frags[i].bbox.left() < split);
        xy_cut(left, frags, min_gutter, tolerance, out);
        xy_cut(right, frags, min_gutter, tolerance, out);
        return;
    }

    let bands = group_bands(&items, frags, tolerance);
    if bands.len() > 1 {
        let cut = widest_band_gap(&bands, frags);
        let mut upper = Vec::new();
        let mut lower = Vec::new();
        for (b, band) in bands.into_iter().enumerate() {
            if b <= cut {
                upper.extend(band);
            } else {
                lower.extend(band);
            }
        }
        xy_cut(upper, frags, min_gutter, tolerance, out);
        xy_cut(lower, frags, min_gutter, tolerance, out);
        return;
    }

    // Leaf: one band, read left to right
    items.sort_by(|&a, &b| by_key(frags, a, b, |f| f.bbox.left()));
    out.extend(items);
}

/// Compare two fragments by a coordinate, falling back to extraction order.
fn by_key(frags: &[Fragment], a: usize, b: usize, key: impl Fn(&Fragment) -> f32) -> Ordering {
    key(&frags[a])
        .total_cmp(&key(&frags[b]))
        .then_with(|| frags[a].id.cmp(&frags[b].id))
}

/// Centre x of the widest vertical whitespace gutter, leftmost on tie.
fn find_gutter(items: &[usize], frags: &[Fragment], min_gutter: f32) -> Option<f32> {
    let mut sorted = items.to_vec();
    sorted.sort_by(|&a, &b| by_key(frags, a, b, |f| f.bbox.left()));

    let mut best: Option<(f32, f32)> = None; // (width, centre)
    let mut reach = frags[sorted[0]].bbox.right();
    for &i in &sorted[1..] {
        let bbox = &frags[i].bbox;
        let gap = bbox.left() - reach;
        if gap >= min_gutter && gap > 0.0 && best.map_or(true, |(w, _)| gap > w) {
            best = Some((gap, reach + gap / 2.0));
        }
        reach = reach.max(bbox.right());
    }
    best.map(|(_, centre)| centre)
}

/// Cluster fragments into horizontal bands of co-line fragments, top to bottom.
fn group_bands(items: &[usize], frags: &[Fragment], tolerance: f32) -> Vec<Vec<usize>> {
    let mut sorted = items.to_vec();
    sorted.sort_by(|&a, &b| by_key(frags, a, b, |f| f.bbox.center_y()));

    let mut bands: Vec<Vec<usize>> = Vec::new();
    let mut band_centre = f32::NEG_INFINITY;
    let mut band_height = 0.0f32;
    for i in sorted {
        let bbox = &frags[i].bbox;
        let reach = tolerance * band_height.max(bbox.height);
        match bands.last_mut() {
            Some(band) if bbox.center_y() - band_centre <= reach => {
                band.push(i);
                band_height = band_height.max(bbox.height);
            }
            _ => {
                bands.push(vec![i]);
                band_centre = bbox.center_y();
                band_height = bbox.height;
            }
        }
    }
    bands
}

/// Index of the band after which the widest whitespace lies, topmost on tie.
fn widest_band_gap(bands: &[Vec<usize>], frags: &[Fragment]) -> usize {
    let bottom = |band: &Vec<usize>| {
        band.iter()
            .map(|&i| frags[i].bbox.bottom())
            .fold(f32::NEG_INFINITY, f32::max)
    };
    let top = |band: &Vec<usize>| {
        band.iter()
            .map(|&i| frags[i].bbox.top())
            .fold(f32::INFINITY, f32::min)
    };

    let mut best = 0;
    let mut best_gap = f32::NEG_INFINITY;
    for b in 0..bands.len() - 1 {
        let gap = top(&bands[b + 1]) - bottom(&bands[b]);
        if gap > best_gap {
            best = b;
            best_gap = gap;
        }
    }
    best
}
