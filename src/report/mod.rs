pub mod json;
pub mod table;

use serde::Serialize;

use crate::analysis::Analysis;

/// Print `value` as JSON, or as the text produced by `text`.
pub fn emit<T: Serialize + ?Sized>(value: &T, as_json: bool, text: impl FnOnce(&T) -> String) {
    if as_json {
        println!("{}", json::render(value));
    } else {
        print!("{}", text(value));
    }
}

pub fn print_scan(analysis: &Analysis, as_json: bool, verbose: bool) {
    let map = analysis.component_map();
    emit(&map, as_json, table::render_component_map);

    if !as_json {
        print_scan_info(analysis, verbose);
    }
}

fn print_scan_info(analysis: &Analysis, verbose: bool) {
    let scan = &analysis.scan;
    if let Some(duration_ms) = scan.duration_ms {
        let duration_sec = duration_ms as f64 / 1000.0;
        println!(
            "\nscanned {} files in {duration_sec:.2}s ({} modules, {} import edges)",
            scan.files.len(),
            analysis.graph.len(),
            analysis.dependencies().len()
        );

        if verbose {
            if let Some(resident) = scan.resident_memory_bytes {
                println!("resident memory: {}", format_bytes(resident as u64));
            }
        }
    }

    let errors = analysis.structural_errors().len();
    if errors > 0 {
        println!("[diagnostic] {errors} structural errors; run 'strata errors' for details");
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_scales_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
