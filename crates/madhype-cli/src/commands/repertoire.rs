use madhype_core::{Result, build_repertoire};

pub fn run(count: usize, alpha: f64, top: usize, output_path: Option<&str>) -> Result<()> {
    let repertoire = build_repertoire(count, alpha)?;
    let freqs = repertoire.frequencies();

    println!("Power-law repertoire: {count} clones, alpha = {alpha}\n");
    println!("{:>6} {:>12} {:>12}", "Rank", "Frequency", "Cumulative");
    println!("{}", "-".repeat(32));

    let mut cumulative = 0.0;
    for (rank, f) in freqs.iter().take(top).enumerate() {
        cumulative += f;
        println!("{:>6} {:>12.4e} {:>11.2}%", rank + 1, f, 100.0 * cumulative);
    }
    if count > top {
        println!("{:>6}", "...");
    }

    println!();
    for fraction in [0.5, 0.9] {
        println!(
            "  {:>3.0}% of cells come from the top {} clones",
            100.0 * fraction,
            (repertoire.top_count(fraction) + 1).min(count)
        );
    }
    println!(
        "  Rarest clone frequency: {:.3e}",
        freqs.last().copied().unwrap_or(0.0)
    );

    if let Some(path) = output_path {
        super::write_json(path, &repertoire)?;
        println!("\nRepertoire saved to: {path}");
    }
    Ok(())
}
