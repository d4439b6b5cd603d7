use pagecut::{build, generate_fragments, pack_epub, BuildOptions, FragmentReport, PackReport};
use std::env;
use std::error::Error;

fn report_fragments(report: &FragmentReport) {
    println!(
        "{} content fragments written ({} sentences, {} words, ~{} pages)",
        report.content_fragments,
        report.metrics.total_sentences,
        report.metrics.total_words,
        report.metrics.estimated_pages
    );
    if !report.had_header {
        eprintln!("Warning: header delimiter not found; whole file treated as content");
    }
    for line in report.skipped_lines.iter() {
        eprintln!("Warning: skipped malformed directive: {}", line);
    }
    for error in report.render_errors.iter() {
        eprintln!("Warning: unit failed to render: {}", error);
    }
    if !report.missing_images.is_empty() {
        eprintln!("Missing image files:");
        for image in report.missing_images.iter() {
            eprintln!(" - {}", image);
        }
    }
}

fn report_pack(report: &PackReport) {
    for warning in report.warnings.iter() {
        eprintln!("Warning: {}", warning);
    }
    println!("Epub written to {}", report.output.display());
}

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = env::args().skip(1).collect();
    let manuscript = args
        .iter()
        .find(|a| !a.starts_with('-'))
        .ok_or("usage: pagecut [-fragments|-pack] <manuscript>")?;
    let options = BuildOptions::new(manuscript);

    if args.iter().any(|a| a == "-pack") {
        let packed = pack_epub(&options)?;
        report_pack(&packed);
    } else if args.iter().any(|a| a == "-fragments") {
        let fragments = generate_fragments(&options)?;
        report_fragments(&fragments);
    } else {
        let (fragments, packed) = build(&options)?;
        report_fragments(&fragments);
        report_pack(&packed);
    }
    Ok(())
}
