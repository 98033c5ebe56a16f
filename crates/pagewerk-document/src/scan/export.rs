// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text exports built from recognised word boxes: plain text, TSV, hOCR,
// ALTO, PAGE XML and the box-file family used for training data.
//
// Page numbers are zero-based in the API and one-based in the rendered
// documents, matching what consumers of these formats expect.

use std::fmt::Write as _;

use pagewerk_core::types::{BoundingBox, OrientationScript, RecognizedWord};

/// Words of one recognised page plus its pixel size.
#[derive(Debug, Clone, Default)]
pub struct PageLayout {
    pub width: u32,
    pub height: u32,
    pub words: Vec<RecognizedWord>,
}

/// A line of words sharing the same line number.
struct Line<'a> {
    words: Vec<&'a RecognizedWord>,
    bbox: BoundingBox,
}

impl PageLayout {
    fn lines(&self) -> Vec<Line<'_>> {
        let mut lines: Vec<Line<'_>> = Vec::new();
        let mut current: Option<u32> = None;
        for word in &self.words {
            match lines.last_mut() {
                Some(line) if current == Some(word.line) => {
                    line.bbox = line.bbox.union(&word.bbox);
                    line.words.push(word);
                }
                _ => {
                    current = Some(word.line);
                    lines.push(Line {
                        words: vec![word],
                        bbox: word.bbox,
                    });
                }
            }
        }
        lines
    }

    fn content_box(&self) -> BoundingBox {
        self.words
            .iter()
            .map(|w| w.bbox)
            .reduce(|a, b| a.union(&b))
            .unwrap_or_default()
    }

    pub fn mean_confidence(&self) -> i32 {
        if self.words.is_empty() {
            return 0;
        }
        let sum: f32 = self.words.iter().map(|w| w.confidence).sum();
        (sum / self.words.len() as f32).round() as i32
    }

    // -- Plain text -----------------------------------------------------------

    /// One line of text per recognised line, each terminated by `\n`.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for line in self.lines() {
            let text: Vec<&str> = line.words.iter().map(|w| w.text.as_str()).collect();
            out.push_str(&text.join(" "));
            out.push('\n');
        }
        out
    }

    // -- TSV ------------------------------------------------------------------

    /// Tab-separated rows: level, page, block, paragraph, line, word, left,
    /// top, width, height, confidence, text.
    pub fn to_tsv(&self, page: u32) -> String {
        let page_num = page + 1;
        let mut out = String::new();
        let row = |out: &mut String,
                   level: u32,
                   line: u32,
                   word: u32,
                   b: &BoundingBox,
                   conf: f32,
                   text: &str| {
            let _ = writeln!(
                out,
                "{level}\t{page_num}\t1\t1\t{line}\t{word}\t{}\t{}\t{}\t{}\t{conf}\t{text}",
                b.left,
                b.top,
                b.width(),
                b.height(),
            );
        };

        let _ = writeln!(
            out,
            "1\t{page_num}\t0\t0\t0\t0\t0\t0\t{}\t{}\t-1\t",
            self.width, self.height
        );
        if self.words.is_empty() {
            return out;
        }
        let content = self.content_box();
        row(&mut out, 2, 0, 0, &content, -1.0, "");
        row(&mut out, 3, 0, 0, &content, -1.0, "");
        for (line_idx, line) in self.lines().iter().enumerate() {
            let line_num = line_idx as u32 + 1;
            row(&mut out, 4, line_num, 0, &line.bbox, -1.0, "");
            for (word_idx, word) in line.words.iter().enumerate() {
                row(
                    &mut out,
                    5,
                    line_num,
                    word_idx as u32 + 1,
                    &word.bbox,
                    word.confidence,
                    &word.text,
                );
            }
        }
        out
    }

    // -- hOCR -----------------------------------------------------------------

    /// hOCR fragment for one page, to be embedded in an hOCR document body.
    pub fn to_hocr(&self, page: u32) -> String {
        let page_num = page + 1;
        let mut out = String::new();
        let _ = writeln!(
            out,
            "  <div class='ocr_page' id='page_{page_num}' title='bbox 0 0 {} {}; ppageno {page}'>",
            self.width, self.height
        );
        if !self.words.is_empty() {
            let c = self.content_box();
            let _ = writeln!(
                out,
                "   <div class='ocr_carea' id='block_{page_num}_1' title=\"bbox {} {} {} {}\">",
                c.left, c.top, c.right, c.bottom
            );
            let _ = writeln!(
                out,
                "    <p class='ocr_par' id='par_{page_num}_1' title=\"bbox {} {} {} {}\">",
                c.left, c.top, c.right, c.bottom
            );
            let mut word_id = 0;
            for (line_idx, line) in self.lines().iter().enumerate() {
                let b = line.bbox;
                let _ = write!(
                    out,
                    "     <span class='ocr_line' id='line_{page_num}_{}' title=\"bbox {} {} {} {}\">",
                    line_idx + 1,
                    b.left,
                    b.top,
                    b.right,
                    b.bottom
                );
                for word in &line.words {
                    word_id += 1;
                    let w = word.bbox;
                    let _ = write!(
                        out,
                        "<span class='ocrx_word' id='word_{page_num}_{word_id}' title='bbox {} {} {} {}; x_wconf {}'>{}</span> ",
                        w.left,
                        w.top,
                        w.right,
                        w.bottom,
                        word.confidence.round() as i32,
                        escape_xml(&word.text)
                    );
                }
                out.push_str("</span>\n");
            }
            out.push_str("    </p>\n   </div>\n");
        }
        out.push_str("  </div>\n");
        out
    }

    // -- ALTO -----------------------------------------------------------------

    /// ALTO `<Page>` element for one page.
    pub fn to_alto(&self, page: u32) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "\t\t\t<Page WIDTH=\"{}\" HEIGHT=\"{}\" PHYSICAL_IMG_NR=\"{page}\" ID=\"page_{page}\">",
            self.width, self.height
        );
        let c = self.content_box();
        let _ = writeln!(
            out,
            "\t\t\t\t<PrintSpace HPOS=\"0\" VPOS=\"0\" WIDTH=\"{}\" HEIGHT=\"{}\">",
            self.width, self.height
        );
        if !self.words.is_empty() {
            let _ = writeln!(
                out,
                "\t\t\t\t\t<TextBlock ID=\"block_0\" HPOS=\"{}\" VPOS=\"{}\" WIDTH=\"{}\" HEIGHT=\"{}\">",
                c.left,
                c.top,
                c.width(),
                c.height()
            );
            for (line_idx, line) in self.lines().iter().enumerate() {
                let b = line.bbox;
                let _ = writeln!(
                    out,
                    "\t\t\t\t\t\t<TextLine ID=\"line_{line_idx}\" HPOS=\"{}\" VPOS=\"{}\" WIDTH=\"{}\" HEIGHT=\"{}\">",
                    b.left,
                    b.top,
                    b.width(),
                    b.height()
                );
                for word in &line.words {
                    let w = word.bbox;
                    let _ = writeln!(
                        out,
                        "\t\t\t\t\t\t\t<String HPOS=\"{}\" VPOS=\"{}\" WIDTH=\"{}\" HEIGHT=\"{}\" WC=\"{:.2}\" CONTENT=\"{}\"/>",
                        w.left,
                        w.top,
                        w.width(),
                        w.height(),
                        word.confidence / 100.0,
                        escape_xml(&word.text)
                    );
                }
                out.push_str("\t\t\t\t\t\t</TextLine>\n");
            }
            out.push_str("\t\t\t\t\t</TextBlock>\n");
        }
        out.push_str("\t\t\t\t</PrintSpace>\n\t\t\t</Page>\n");
        out
    }

    // -- PAGE XML -------------------------------------------------------------

    /// PAGE XML `<Page>` element for one page.
    pub fn to_page_xml(&self, page: u32, image_name: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "\t<Page imageFilename=\"{}\" imageWidth=\"{}\" imageHeight=\"{}\" id=\"page_{page}\">",
            escape_xml(image_name),
            self.width,
            self.height
        );
        if !self.words.is_empty() {
            let c = self.content_box();
            let _ = writeln!(out, "\t\t<TextRegion id=\"r_{page}_1\">");
            let _ = writeln!(out, "\t\t\t<Coords points=\"{}\"/>", polygon(&c));
            for (line_idx, line) in self.lines().iter().enumerate() {
                let _ = writeln!(out, "\t\t\t<TextLine id=\"l_{page}_{}\">", line_idx + 1);
                let _ = writeln!(out, "\t\t\t\t<Coords points=\"{}\"/>", polygon(&line.bbox));
                for (word_idx, word) in line.words.iter().enumerate() {
                    let _ = writeln!(
                        out,
                        "\t\t\t\t<Word id=\"w_{page}_{}_{}\"><Coords points=\"{}\"/><TextEquiv conf=\"{:.2}\"><Unicode>{}</Unicode></TextEquiv></Word>",
                        line_idx + 1,
                        word_idx + 1,
                        polygon(&word.bbox),
                        word.confidence / 100.0,
                        escape_xml(&word.text)
                    );
                }
                out.push_str("\t\t\t</TextLine>\n");
            }
            out.push_str("\t\t</TextRegion>\n");
        }
        out.push_str("\t</Page>\n");
        out
    }

    // -- Box files ------------------------------------------------------------

    /// One row per character: `c left bottom right top page`, with y measured
    /// from the bottom of the page. Character boxes split their word evenly.
    pub fn to_box(&self, page: u32) -> String {
        let mut out = String::new();
        for word in &self.words {
            for (ch, b) in char_boxes(word) {
                let _ = writeln!(
                    out,
                    "{ch} {} {} {} {} {page}",
                    b.left,
                    self.flip(b.bottom),
                    b.right,
                    self.flip(b.top)
                );
            }
        }
        out
    }

    /// Like [`to_box`](Self::to_box) with a tab row closing every line.
    pub fn to_lstm_box(&self, page: u32) -> String {
        let mut out = String::new();
        for line in self.lines() {
            for (word_idx, word) in line.words.iter().enumerate() {
                if word_idx > 0 {
                    let b = word.bbox;
                    let _ = writeln!(
                        out,
                        "  {} {} {} {} {page}",
                        b.left,
                        self.flip(b.bottom),
                        b.left,
                        self.flip(b.top)
                    );
                }
                for (ch, b) in char_boxes(word) {
                    let _ = writeln!(
                        out,
                        "{ch} {} {} {} {} {page}",
                        b.left,
                        self.flip(b.bottom),
                        b.right,
                        self.flip(b.top)
                    );
                }
            }
            let b = line.bbox;
            let _ = writeln!(
                out,
                "\t {} {} {} {} {page}",
                b.right,
                self.flip(b.bottom),
                b.right + 1,
                self.flip(b.top)
            );
        }
        out
    }

    /// One `WordStr` row per line followed by a tab row.
    pub fn to_word_str_box(&self, page: u32) -> String {
        let mut out = String::new();
        for line in self.lines() {
            let b = line.bbox;
            let text: Vec<&str> = line.words.iter().map(|w| w.text.as_str()).collect();
            let _ = writeln!(
                out,
                "WordStr {} {} {} {} {page} #{}",
                b.left,
                self.flip(b.bottom),
                b.right,
                self.flip(b.top),
                text.join(" ")
            );
            let _ = writeln!(
                out,
                "\t {} {} {} {} {page}",
                b.right,
                self.flip(b.bottom),
                b.right + 1,
                self.flip(b.top)
            );
        }
        out
    }

    fn flip(&self, y: i32) -> i32 {
        self.height as i32 - y
    }
}

/// Orientation/script report in the usual OSD text layout.
pub fn osd_text(page: u32, osd: &OrientationScript) -> String {
    let rotate = (360 - osd.orientation_degrees).rem_euclid(360);
    format!(
        "Page number: {page}\nOrientation in degrees: {}\nRotate: {rotate}\nOrientation confidence: {:.2}\nScript: {}\nScript confidence: {:.2}\n",
        osd.orientation_degrees, osd.orientation_confidence, osd.script_name, osd.script_confidence
    )
}

fn char_boxes(word: &RecognizedWord) -> Vec<(char, BoundingBox)> {
    let chars: Vec<char> = word.text.chars().filter(|c| !c.is_whitespace()).collect();
    if chars.is_empty() {
        return Vec::new();
    }
    let n = chars.len() as i32;
    let width = word.bbox.width().max(n);
    chars
        .into_iter()
        .enumerate()
        .map(|(i, ch)| {
            let i = i as i32;
            let left = word.bbox.left + width * i / n;
            let right = word.bbox.left + width * (i + 1) / n;
            (
                ch,
                BoundingBox {
                    left,
                    top: word.bbox.top,
                    right,
                    bottom: word.bbox.bottom,
                },
            )
        })
        .collect()
}

fn polygon(b: &BoundingBox) -> String {
    format!(
        "{},{} {},{} {},{} {},{}",
        b.left, b.top, b.right, b.top, b.right, b.bottom, b.left, b.bottom
    )
}

/// Escape the five XML special characters.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
