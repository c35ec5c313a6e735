//! Progress reporting and summary output for the CLI

use std::path::Path;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Progress reporter for a line-by-line pass
pub struct ProgressReporter {
    _multi: MultiProgress,
    main_bar: ProgressBar,
    stats_bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a reporter over `total_lines` lines, drawing nothing when `hidden`
    pub fn new(total_lines: u64, hidden: bool) -> Self {
        let multi = if hidden {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        } else {
            MultiProgress::new()
        };

        let main_bar = multi.add(ProgressBar::new(total_lines));
        main_bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {human_pos}/{human_len} lines ({per_sec}) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓▒░-"),
        );

        let stats_bar = multi.add(ProgressBar::new(0));
        stats_bar.set_style(
            ProgressStyle::default_bar()
                .template("Stats: {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        Self {
            _multi: multi,
            main_bar,
            stats_bar,
        }
    }

    /// Update progress with current counts
    pub fn update(&self, lines: usize, records: usize, duplicates: usize) {
        self.main_bar.set_position(lines as u64);
        self.main_bar.set_message("Processing...");

        let stats_msg = if duplicates > 0 {
            format!(
                "{} records | {} duplicates ({:.1}%)",
                Self::format_number(records),
                Self::format_number(duplicates),
                (duplicates as f64 / records as f64) * 100.0
            )
        } else {
            format!("{} records", Self::format_number(records))
        };

        self.stats_bar.set_message(stats_msg);
    }

    /// Finish progress reporting
    pub fn finish(&self) {
        self.main_bar.finish_with_message("Complete!");
        self.stats_bar.finish();
    }

    /// Format large numbers compactly
    fn format_number(n: usize) -> String {
        if n >= 1_000_000 {
            format!("{:.1}M", n as f64 / 1_000_000.0)
        } else if n >= 1_000 {
            format!("{:.1}K", n as f64 / 1_000.0)
        } else {
            n.to_string()
        }
    }
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// Print a formatted summary report for a removal pass
pub fn print_summary_report(input: &Path, output: Option<&Path>, total: usize, duplicates: usize) {
    let kept = total - duplicates;

    println!("\n{}", "═".repeat(60));
    println!("Duplicate Removal Complete");
    println!("{}", "═".repeat(60));
    println!("Input:              {}", input.display());

    if let Some(output_path) = output {
        println!("Output:             {}", output_path.display());
    } else {
        println!("Output:             (dry run - no output written)");
    }

    println!("Total records:      {}", format_with_commas(total));
    println!(
        "Duplicates removed: {} ({:.1}%)",
        format_with_commas(duplicates),
        percent(duplicates, total)
    );
    println!(
        "Final records:      {} ({:.1}%)",
        format_with_commas(kept),
        percent(kept, total)
    );

    println!("{}", "═".repeat(60));
}

/// Format number with thousand separators
pub fn format_with_commas(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
