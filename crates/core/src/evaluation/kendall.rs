use std::cmp::Ordering;

/// Kendall's tau-b between two paired rankings, with tie correction on both
/// sides.
///
/// `None` when the inputs differ in length, hold fewer than two pairs, or
/// either side has no variation.
pub fn kendall_tau_b(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }

    let mut concordant = 0_u64;
    let mut discordant = 0_u64;
    let mut tied_x = 0_u64;
    let mut tied_y = 0_u64;
    for i in 0..x.len() {
        for j in (i + 1)..x.len() {
            match (x[i].total_cmp(&x[j]), y[i].total_cmp(&y[j])) {
                (Ordering::Equal, Ordering::Equal) => {
                    tied_x += 1;
                    tied_y += 1;
                }
                (Ordering::Equal, _) => tied_x += 1,
                (_, Ordering::Equal) => tied_y += 1,
                (dx, dy) if dx == dy => concordant += 1,
                _ => discordant += 1,
            }
        }
    }

    let pairs = (x.len() * (x.len() - 1) / 2) as u64;
    let denominator = ((pairs - tied_x) as f64 * (pairs - tied_y) as f64).sqrt();
    if denominator == 0.0 {
        return None;
    }

    Some((concordant as f64 - discordant as f64) / denominator)
}
