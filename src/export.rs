use std::io::Write;

use crate::ingest::EXPORT_HEADERS;
use crate::models::Review;

/// Writes reviews in the explorer layout. The header line is bare; in records
/// text columns are always quoted and embedded quotes doubled, while the
/// rating stays a bare number.
pub fn write_reviews<W: Write>(mut writer: W, reviews: &[Review]) -> Result<(), csv::Error> {
    {
        let mut header = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Necessary)
            .from_writer(&mut writer);
        header.write_record(EXPORT_HEADERS)?;
        header.flush()?;
    }

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::NonNumeric)
        .from_writer(writer);

    for review in reviews {
        let rating = review.rating.to_string();
        writer.write_record([
            review.id.as_str(),
            review.platform.as_str(),
            review.author.as_str(),
            rating.as_str(),
            review.date.as_str(),
            review.sentiment.as_str(),
            review.theme.as_str(),
            review.text.as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
