// HTML stat-table extraction.
//
// Hockey-Reference marks every cell with a `data-stat` attribute, which is a
// far steadier key than column position. Secondary tables are sometimes
// shipped inside HTML comments and revealed by script, so those are searched
// too.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use puckrank_core::normalize::RawRow;

/// Row classes that mark repeated headers and visual separators.
const NON_DATA_ROW_CLASSES: &[&str] = &["thead", "over_header", "spacer", "partial_table_divider"];

/// Extract the body rows of `table#<table_id>` as `data-stat` to text maps.
///
/// Returns `None` when the table is neither in the live markup nor inside an
/// HTML comment.
pub fn extract_rows(html: &str, table_id: &str) -> Option<Vec<RawRow>> {
    let document = Html::parse_document(html);
    if let Some(rows) = rows_from_document(&document, table_id) {
        return Some(rows);
    }

    let marker = format!("id=\"{table_id}\"");
    for fragment in commented_sections(html) {
        if !fragment.contains(&marker) {
            continue;
        }
        debug!("table {table_id} found inside an HTML comment");
        let inner = Html::parse_document(fragment);
        if let Some(rows) = rows_from_document(&inner, table_id) {
            return Some(rows);
        }
    }
    None
}

fn rows_from_document(document: &Html, table_id: &str) -> Option<Vec<RawRow>> {
    let table_selector = Selector::parse(&format!("table#{table_id}")).ok()?;
    let row_selector = Selector::parse("tbody > tr").ok()?;
    let cell_selector = Selector::parse("th, td").ok()?;

    let table = document.select(&table_selector).next()?;
    let rows = table
        .select(&row_selector)
        .filter(|row| !is_non_data_row(row))
        .map(|row| row_cells(&row, &cell_selector))
        .filter(|cells| !cells.is_empty())
        .collect();
    Some(rows)
}

fn is_non_data_row(row: &ElementRef<'_>) -> bool {
    row.value()
        .classes()
        .any(|class| NON_DATA_ROW_CLASSES.contains(&class))
}

fn row_cells(row: &ElementRef<'_>, cell_selector: &Selector) -> RawRow {
    row.select(cell_selector)
        .filter_map(|cell| {
            let stat = cell.value().attr("data-stat")?;
            let text = cell.text().collect::<String>();
            Some((stat.to_string(), text.trim().to_string()))
        })
        .collect()
}

/// Bodies of every `<!-- ... -->` block, in document order.
fn commented_sections(html: &str) -> Vec<&str> {
    let mut sections = Vec::new();
    let mut rest = html;
    while let Some(start) = rest.find("<!--") {
        let body = &rest[start + 4..];
        let Some(end) = body.find("-->") else {
            break;
        };
        sections.push(&body[..end]);
        rest = &body[end + 3..];
    }
    sections
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<html><body>
<table id="player_stats">
  <thead><tr><th data-stat="ranker">Rk</th><th data-stat="name_display">Player</th></tr></thead>
  <tbody>
    <tr>
      <th data-stat="ranker">1</th>
      <td data-stat="name_display"><a href="/players/m/mackina01.html">Nathan MacKinnon</a></td>
      <td data-stat="team_name_abbr">COL</td>
      <td data-stat="goals"> 51 </td>
      <td data-stat="hits"></td>
    </tr>
    <tr class="thead"><th data-stat="ranker">Rk</th><td data-stat="name_display">Player</td></tr>
    <tr class="spacer"><td colspan="5"></td></tr>
    <tr>
      <th data-stat="ranker">2</th>
      <td data-stat="name_display">Bo Horvat</td>
      <td data-stat="team_name_abbr">2TM</td>
      <td data-stat="goals">38</td>
      <td data-stat="hits">30</td>
    </tr>
  </tbody>
</table>
</body></html>"#;

    #[test]
    fn reads_cells_by_data_stat() {
        let rows = extract_rows(PAGE, "player_stats").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name_display"], "Nathan MacKinnon");
        assert_eq!(rows[0]["goals"], "51");
        assert_eq!(rows[0]["hits"], "");
        assert_eq!(rows[0]["ranker"], "1");
        assert_eq!(rows[1]["team_name_abbr"], "2TM");
    }

    #[test]
    fn missing_table_is_none() {
        assert!(extract_rows(PAGE, "goalie_stats").is_none());
    }

    #[test]
    fn finds_table_inside_comment() {
        let page = r#"<html><body><div id="all_goalie_stats"><!--
<table id="goalie_stats"><tbody>
<tr><td data-stat="name_display">Connor Hellebuyck</td><td data-stat="wins_goalie">37</td></tr>
</tbody></table>
--></div></body></html>"#;
        let rows = extract_rows(page, "goalie_stats").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["wins_goalie"], "37");
    }

    #[test]
    fn table_without_body_rows_is_empty() {
        let page = r#"<table id="player_stats"><thead><tr><th data-stat="x">X</th></tr></thead><tbody></tbody></table>"#;
        assert_eq!(extract_rows(page, "player_stats").unwrap().len(), 0);
    }

    #[test]
    fn comment_scanner_handles_unterminated_comment() {
        let sections = commented_sections("<p>a</p><!-- one --><!-- two");
        assert_eq!(sections, vec![" one "]);
    }
}
