//! Text sparkline for temperature series

/// Block characters for different values (8 levels)
const BLOCKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Maps a value within `min..=max` to a block character
fn value_to_block(value: i32, min: i32, max: i32) -> char {
    if max <= min {
        return BLOCKS[3];
    }
    let normalized = (f64::from(value - min) / f64::from(max - min)).clamp(0.0, 1.0);
    let index = ((normalized * 7.0).round() as usize).min(7);
    BLOCKS[index]
}

/// Renders `values` as one block character each, scaled to their own range
pub fn sparkline(values: &[i32]) -> String {
    let (Some(&min), Some(&max)) = (values.iter().min(), values.iter().max()) else {
        return String::new();
    };
    values.iter().map(|&v| value_to_block(v, min, max)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_to_block_minimum() {
        assert_eq!(value_to_block(50, 50, 80), '▁');
    }

    #[test]
    fn test_value_to_block_maximum() {
        assert_eq!(value_to_block(80, 50, 80), '█');
    }

    #[test]
    fn test_flat_series_uses_middle_block() {
        assert_eq!(sparkline(&[64, 64, 64]), "▄▄▄");
    }

    #[test]
    fn test_sparkline_scales_to_range() {
        assert_eq!(sparkline(&[60, 67, 74]), "▁▅█");
    }

    #[test]
    fn test_empty_series() {
        assert_eq!(sparkline(&[]), "");
    }
}
