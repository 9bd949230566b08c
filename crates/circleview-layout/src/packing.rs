use circleview_core::{Circle, Vector};

// Front-chain circle packing with a smallest-enclosing-circle pass, the
// Wang et al. sibling packing d3 popularized. Deterministic: input order is
// processed as given, no shuffling.

/// Pack circles of the given radii so that successive circles are tangent to
/// the front chain and none overlap. The result is translated so the
/// enclosing circle of the packing is centered at the origin; its radius is
/// returned alongside the positions.
pub fn pack_siblings(radii: &[f64]) -> (Vec<Circle>, f64) {
    let n = radii.len();
    let mut circles: Vec<Circle> = radii
        .iter()
        .map(|&r| Circle::new(Vector::ZERO, r))
        .collect();

    if n == 0 {
        return (circles, 0.0);
    }
    if n == 1 {
        return (circles, radii[0]);
    }

    // Place the first two circles tangent around the origin.
    circles[0].center = Vector::new(-circles[1].r, 0.0);
    circles[1].center = Vector::new(circles[0].r, 0.0);

    if n > 2 {
        circles[2] = place(&circles[1], &circles[0], circles[2].r);

        // Doubly linked front chain over circle indices.
        let mut next = vec![0usize; n];
        let mut prev = vec![0usize; n];
        next[0] = 1;
        next[1] = 2;
        next[2] = 0;
        prev[0] = 2;
        prev[1] = 0;
        prev[2] = 1;
        let (mut a, mut b) = (0usize, 1usize);

        let mut i = 3;
        'pack: while i < n {
            let c = i;
            circles[c] = place(&circles[b], &circles[a], circles[c].r);

            // Find the closest circle on the front chain intersecting c,
            // scanning both directions weighted by circumference covered.
            let mut j = next[b];
            let mut k = prev[a];
            let mut sj = circles[b].r;
            let mut sk = circles[a].r;
            loop {
                if sj <= sk {
                    if intersects(&circles[j], &circles[c]) {
                        b = j;
                        next[a] = b;
                        prev[b] = a;
                        continue 'pack;
                    }
                    sj += circles[j].r;
                    j = next[j];
                } else {
                    if intersects(&circles[k], &circles[c]) {
                        a = k;
                        next[a] = b;
                        prev[b] = a;
                        continue 'pack;
                    }
                    sk += circles[k].r;
                    k = prev[k];
                }
                if j == next[k] {
                    break;
                }
            }

            // No intersection: insert c between a and b.
            prev[c] = a;
            next[c] = b;
            next[a] = c;
            prev[b] = c;
            b = c;

            // Restart the chain at the pair whose weighted midpoint is
            // closest to the packing center.
            let mut best = a;
            let mut best_score = chain_score(&circles, &next, best);
            let mut walk = next[b];
            while walk != b {
                let score = chain_score(&circles, &next, walk);
                if score < best_score {
                    best = walk;
                    best_score = score;
                }
                walk = next[walk];
            }
            a = best;
            b = next[best];
            i += 1;
        }

        // Enclose the front chain (it contains the hull of the packing).
        let mut chain = vec![circles[b]];
        let mut walk = next[b];
        while walk != b {
            chain.push(circles[walk]);
            walk = next[walk];
        }
        let enclosure = enclosing_circle(&chain);
        for circle in &mut circles {
            circle.center = circle.center - enclosure.center;
        }
        return (circles, enclosure.r);
    }

    let enclosure = enclosing_circle(&circles);
    for circle in &mut circles {
        circle.center = circle.center - enclosure.center;
    }
    (circles, enclosure.r)
}

/// Position a circle of radius `r` tangent to both `a` and `b`, on the outer
/// side of the chain edge from `a` to `b`.
fn place(b: &Circle, a: &Circle, r: f64) -> Circle {
    let dx = b.center.x - a.center.x;
    let dy = b.center.y - a.center.y;
    let d2 = dx * dx + dy * dy;
    if d2 > f64::EPSILON {
        let a2 = (a.r + r) * (a.r + r);
        let b2 = (b.r + r) * (b.r + r);
        if a2 > b2 {
            let x = (d2 + b2 - a2) / (2.0 * d2);
            let y = (b2 / d2 - x * x).max(0.0).sqrt();
            Circle::new(
                Vector::new(b.center.x - x * dx - y * dy, b.center.y - x * dy + y * dx),
                r,
            )
        } else {
            let x = (d2 + a2 - b2) / (2.0 * d2);
            let y = (a2 / d2 - x * x).max(0.0).sqrt();
            Circle::new(
                Vector::new(a.center.x + x * dx - y * dy, a.center.y + x * dy + y * dx),
                r,
            )
        }
    } else {
        Circle::new(Vector::new(a.center.x + a.r + r, a.center.y), r)
    }
}

fn intersects(a: &Circle, b: &Circle) -> bool {
    let dr = a.r + b.r - 1e-6;
    dr > 0.0 && dr * dr > sq_distance(a, b)
}

fn sq_distance(a: &Circle, b: &Circle) -> f64 {
    let dx = b.center.x - a.center.x;
    let dy = b.center.y - a.center.y;
    dx * dx + dy * dy
}

/// Squared distance from the packing center to the weighted midpoint of the
/// chain edge starting at `index`.
fn chain_score(circles: &[Circle], next: &[usize], index: usize) -> f64 {
    let a = &circles[index];
    let b = &circles[next[index]];
    let ab = a.r + b.r;
    let dx = (a.center.x * b.r + b.center.x * a.r) / ab;
    let dy = (a.center.y * b.r + b.center.y * a.r) / ab;
    dx * dx + dy * dy
}

/// Smallest circle enclosing all of `circles`, computed incrementally over a
/// basis of at most three support circles.
pub fn enclosing_circle(circles: &[Circle]) -> Circle {
    let mut basis: Vec<Circle> = Vec::new();
    let mut enclosure: Option<Circle> = None;
    let mut i = 0;
    while i < circles.len() {
        let p = circles[i];
        match enclosure {
            Some(e) if encloses_weak(&e, &p) => i += 1,
            _ => {
                basis = extend_basis(&basis, p);
                enclosure = Some(enclose_basis(&basis));
                i = 0;
            }
        }
    }
    enclosure.unwrap_or_default()
}

fn extend_basis(basis: &[Circle], p: Circle) -> Vec<Circle> {
    if encloses_weak_all(&p, basis) {
        return vec![p];
    }

    // One of the existing support circles plus p suffices.
    for b in basis {
        if encloses_not(&p, b) && encloses_weak_all(&enclose_basis_2(b, &p), basis) {
            return vec![*b, p];
        }
    }

    // Otherwise a pair of support circles plus p.
    for i in 0..basis.len().saturating_sub(1) {
        for j in (i + 1)..basis.len() {
            let (bi, bj) = (&basis[i], &basis[j]);
            if encloses_not(&enclose_basis_2(bi, bj), &p)
                && encloses_not(&enclose_basis_2(bi, &p), bj)
                && encloses_not(&enclose_basis_2(bj, &p), bi)
                && encloses_weak_all(&enclose_basis_3(bi, bj, &p), basis)
            {
                return vec![*bi, *bj, p];
            }
        }
    }

    unreachable!("enclosing-circle basis extension failed");
}

fn encloses_not(a: &Circle, b: &Circle) -> bool {
    let dr = a.r - b.r;
    dr < 0.0 || dr * dr < sq_distance(a, b)
}

fn encloses_weak(a: &Circle, b: &Circle) -> bool {
    let dr = a.r - b.r + a.r.max(b.r).max(1.0) * 1e-9;
    dr > 0.0 && dr * dr > sq_distance(a, b)
}

fn encloses_weak_all(a: &Circle, basis: &[Circle]) -> bool {
    basis.iter().all(|b| encloses_weak(a, b))
}

fn enclose_basis(basis: &[Circle]) -> Circle {
    match basis {
        [a] => *a,
        [a, b] => enclose_basis_2(a, b),
        [a, b, c] => enclose_basis_3(a, b, c),
        _ => unreachable!("enclosing-circle basis holds one to three circles"),
    }
}

fn enclose_basis_2(a: &Circle, b: &Circle) -> Circle {
    let x21 = b.center.x - a.center.x;
    let y21 = b.center.y - a.center.y;
    let r21 = b.r - a.r;
    let l = (x21 * x21 + y21 * y21).sqrt();
    Circle::new(
        Vector::new(
            (a.center.x + b.center.x + x21 / l * r21) / 2.0,
            (a.center.y + b.center.y + y21 / l * r21) / 2.0,
        ),
        (l + a.r + b.r) / 2.0,
    )
}

fn enclose_basis_3(a: &Circle, b: &Circle, c: &Circle) -> Circle {
    let (x1, y1, r1) = (a.center.x, a.center.y, a.r);
    let (x2, y2, r2) = (b.center.x, b.center.y, b.r);
    let (x3, y3, r3) = (c.center.x, c.center.y, c.r);
    let a2 = x1 - x2;
    let a3 = x1 - x3;
    let b2 = y1 - y2;
    let b3 = y1 - y3;
    let c2 = r2 - r1;
    let c3 = r3 - r1;
    let d1 = x1 * x1 + y1 * y1 - r1 * r1;
    let d2 = d1 - x2 * x2 - y2 * y2 + r2 * r2;
    let d3 = d1 - x3 * x3 - y3 * y3 + r3 * r3;
    let ab = a3 * b2 - a2 * b3;
    let xa = (b2 * d3 - b3 * d2) / (ab * 2.0) - x1;
    let xb = (b3 * c2 - b2 * c3) / ab;
    let ya = (a3 * d2 - a2 * d3) / (ab * 2.0) - y1;
    let yb = (a2 * c3 - a3 * c2) / ab;
    let qa = xb * xb + yb * yb - 1.0;
    let qb = 2.0 * (r1 + xa * xb + ya * yb);
    let qc = xa * xa + ya * ya - r1 * r1;
    let r = -if qa.abs() > 1e-6 {
        (qb + (qb * qb - 4.0 * qa * qc).sqrt()) / (2.0 * qa)
    } else {
        qc / qb
    };
    Circle::new(Vector::new(x1 + xa + xb * r, y1 + ya + yb * r), r)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_packing_valid(circles: &[Circle], enclosing_r: f64) {
        for (i, a) in circles.iter().enumerate() {
            // Every circle lies inside the enclosure, which sits at origin.
            assert!(
                a.center.length() + a.r <= enclosing_r + 1e-6,
                "circle {i} escapes the enclosure"
            );
            for (j, b) in circles.iter().enumerate().skip(i + 1) {
                let dist = a.center.distance(b.center);
                assert!(
                    dist + 1e-6 >= a.r + b.r - 1e-6,
                    "circles {i} and {j} overlap: dist {dist}, radii {} {}",
                    a.r,
                    b.r
                );
            }
        }
    }

    #[test]
    fn test_two_equal_circles_pack_tangent() {
        let (circles, enclosing_r) = pack_siblings(&[1.0, 1.0]);
        assert!((circles[0].center.distance(circles[1].center) - 2.0).abs() < 1e-9);
        assert!((enclosing_r - 2.0).abs() < 1e-9);
        assert_packing_valid(&circles, enclosing_r);
    }

    #[test]
    fn test_three_equal_circles_pack_mutually_tangent() {
        let (circles, enclosing_r) = pack_siblings(&[1.0, 1.0, 1.0]);
        for i in 0..3 {
            for j in (i + 1)..3 {
                let dist = circles[i].center.distance(circles[j].center);
                assert!((dist - 2.0).abs() < 1e-9, "pair {i},{j} at distance {dist}");
            }
        }
        // Known enclosure for three unit circles: 1 + 2/sqrt(3).
        assert!((enclosing_r - (1.0 + 2.0 / 3.0f64.sqrt())).abs() < 1e-9);
        assert_packing_valid(&circles, enclosing_r);
    }

    #[test]
    fn test_mixed_radii_pack_without_overlap() {
        let radii = [12.0, 3.0, 7.5, 20.0, 1.0, 9.0, 9.0, 4.2];
        let (circles, enclosing_r) = pack_siblings(&radii);
        assert_eq!(circles.len(), radii.len());
        for (circle, &r) in circles.iter().zip(radii.iter()) {
            assert_eq!(circle.r, r);
        }
        assert_packing_valid(&circles, enclosing_r);
    }

    #[test]
    fn test_single_circle_enclosure_is_itself() {
        let (circles, enclosing_r) = pack_siblings(&[5.0]);
        assert_eq!(circles[0].center, Vector::ZERO);
        assert_eq!(enclosing_r, 5.0);
    }

    #[test]
    fn test_enclosing_circle_contains_all_inputs() {
        let circles = vec![
            Circle::new(Vector::new(0.0, 0.0), 1.0),
            Circle::new(Vector::new(10.0, 0.0), 2.0),
            Circle::new(Vector::new(5.0, 8.0), 3.0),
            Circle::new(Vector::new(-4.0, 3.0), 0.5),
        ];
        let enclosure = enclosing_circle(&circles);
        for circle in &circles {
            assert!(
                enclosure.center.distance(circle.center) + circle.r <= enclosure.r + 1e-6,
                "{circle:?} escapes {enclosure:?}"
            );
        }
    }

    #[test]
    fn test_enclosing_circle_of_tangent_pair_is_tight() {
        let circles = vec![
            Circle::new(Vector::new(-1.0, 0.0), 1.0),
            Circle::new(Vector::new(1.0, 0.0), 1.0),
        ];
        let enclosure = enclosing_circle(&circles);
        assert!((enclosure.r - 2.0).abs() < 1e-9);
        assert!(enclosure.center.length() < 1e-9);
    }
}
