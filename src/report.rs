use crate::backup::classify::{BackupStats, CopyStats};

/// Everything a notification needs to describe a run.
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub config_name: String,
    pub backup_rows: Vec<BackupStats>,
    pub copy_rows: Vec<CopyStats>,
    pub transcript: Vec<String>,
}

impl Report {
    pub fn new(config_name: impl Into<String>) -> Self {
        Self {
            config_name: config_name.into(),
            ..Self::default()
        }
    }

    pub fn text_body(&self) -> String {
        self.transcript.join("\r\n")
    }

    pub fn html_body(&self) -> String {
        let mut html = HtmlBuilder::new(&self.config_name);
        if !self.backup_rows.is_empty() {
            html.open_backup_table();
            for row in &self.backup_rows {
                html.backup_row(row);
            }
            html.close_table();
        }
        if !self.copy_rows.is_empty() {
            html.open_copy_table();
            for row in &self.copy_rows {
                html.copy_row(row);
            }
            html.close_table();
        }
        html.finish(&self.transcript)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableSection {
    None,
    Backup,
    Copy,
}

const STYLE: &[&str] = &[
    "<!DOCTYPE html>",
    "<html>",
    "<head>",
    "<style>",
    "table {",
    "    font-family: arial, sans-serif;",
    "    border-collapse: collapse;",
    "    width: 100%;",
    "}",
    "td, th {",
    "    border: 1px solid #dddddd;",
    "    text-align: right;",
    "    padding: 8px;",
    "}",
    "",
    "tr:nth-child(even) {",
    "    background-color: #dddddd;",
    "}",
    "</style>",
    "</head>",
    "<body>",
    "",
];

/// Line-oriented HTML writer. Opening a table while another is open, or
/// writing a row into the wrong table, is a bug in the caller and panics.
struct HtmlBuilder {
    lines: Vec<String>,
    section: TableSection,
}

impl HtmlBuilder {
    fn new(config_name: &str) -> Self {
        let mut lines: Vec<String> = STYLE.iter().map(|s| s.to_string()).collect();
        lines.push(format!(
            "<h1>Statistics for configuration: {}</h1>",
            escape_html(config_name)
        ));
        Self {
            lines,
            section: TableSection::None,
        }
    }

    fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    fn cell(&mut self, value: &str, left: bool) {
        if left {
            self.push(format!(
                "    <td style=\"text-align: left\">{}</td>",
                escape_html(value)
            ));
        } else {
            self.push(format!("    <td>{}</td>", escape_html(value)));
        }
    }

    fn open_table(&mut self, section: TableSection, title: &str, headers: &[(&str, bool)]) {
        assert_eq!(
            self.section,
            TableSection::None,
            "cannot open {:?} table inside {:?} table",
            section,
            self.section
        );
        self.section = section;
        self.push("");
        self.push(format!("<h3>{}</h3>", title));
        self.push("<table>");
        self.push("  <tr>");
        for (header, left) in headers {
            if *left {
                self.push(format!("    <th style=\"text-align: left\">{}</th>", header));
            } else {
                self.push(format!("    <th>{}</th>", header));
            }
        }
        self.push("  </tr>");
    }

    fn open_backup_table(&mut self) {
        self.open_table(
            TableSection::Backup,
            "Backup Summary:",
            &[
                ("Storage", true),
                ("Duration", false),
                ("Total Chunks", false),
                ("Total Used", false),
                ("New Files", false),
                ("New File Size", false),
                ("New Chunks", false),
                ("New Uploaded", false),
            ],
        );
    }

    fn open_copy_table(&mut self) {
        self.open_table(
            TableSection::Copy,
            "Copy Summary:",
            &[
                ("From Storage", true),
                ("To Storage", true),
                ("Duration", false),
                ("Total Chunks", false),
                ("Chunks Skipped", false),
                ("Chunks Copied", false),
            ],
        );
    }

    fn backup_row(&mut self, row: &BackupStats) {
        assert_eq!(self.section, TableSection::Backup, "backup row outside backup table");
        self.push("  <tr>");
        self.cell(&row.storage, true);
        self.cell(&row.duration, false);
        self.cell(&row.chunk_total_count, false);
        self.cell(&row.chunk_total_size, false);
        self.cell(&row.files_new_count, false);
        self.cell(&row.files_new_size, false);
        self.cell(&row.chunk_new_count, false);
        self.cell(&row.chunk_new_uploaded, false);
        self.push("  </tr>");
    }

    fn copy_row(&mut self, row: &CopyStats) {
        assert_eq!(self.section, TableSection::Copy, "copy row outside copy table");
        self.push("  <tr>");
        self.cell(&row.storage_from, true);
        self.cell(&row.storage_to, true);
        self.cell(&row.duration, false);
        self.cell(&row.chunk_total_count, false);
        self.cell(&row.chunk_skip_count, false);
        self.cell(&row.chunk_copy_count, false);
        self.push("  </tr>");
    }

    fn close_table(&mut self) {
        assert_ne!(self.section, TableSection::None, "no table is open");
        self.section = TableSection::None;
        self.push("</table>");
    }

    fn finish(mut self, transcript: &[String]) -> String {
        assert_eq!(self.section, TableSection::None, "table left open");
        let log: Vec<String> = transcript
            .iter()
            .map(|line| escape_html(line).replace(' ', "&nbsp;"))
            .collect();
        self.push("<br><br><br><b>Log Text:</b><br><br>");
        self.push(log.join("<br>\n"));
        self.push("</body>");
        self.push("</html>");
        self.lines.join("\r\n")
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
