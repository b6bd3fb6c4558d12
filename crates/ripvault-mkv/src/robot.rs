//! makemkvcon robot-mode (`-r`) line parsing.
//!
//! Every line is `PREFIX:field,field,...` where string fields are quoted and
//! may contain commas or backslash-escaped quotes.

/// One parsed line of robot output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RobotLine {
    /// Disc attribute.
    Cinfo { attr: u32, value: String },
    /// Title attribute.
    Tinfo { title: u32, attr: u32, value: String },
    /// Stream attribute.
    Sinfo {
        title: u32,
        stream: u32,
        attr: u32,
        value: String,
    },
    /// Number of titles on the disc.
    TitleCount(u32),
    /// Current operation title.
    ProgressTitle(String),
    /// Current sub-operation.
    ProgressChannel(String),
    /// Progress bar values.
    ProgressValue { current: u32, total: u32, max: u32 },
    /// Log message.
    Message { code: u32, text: String },
}

/// Split a robot field list, honouring quotes.
pub fn split_fields(s: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    cur.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            '\\' if in_quotes => {
                if let Some(next) = chars.next() {
                    cur.push(next);
                }
            }
            ',' if !in_quotes => fields.push(std::mem::take(&mut cur)),
            _ => cur.push(c),
        }
    }
    fields.push(cur);
    fields
}

fn num(fields: &[String], idx: usize) -> Option<u32> {
    fields.get(idx)?.trim().parse().ok()
}

fn text(fields: &[String], idx: usize) -> Option<String> {
    fields.get(idx).cloned()
}

/// Parse one line. Unknown prefixes and malformed lines yield `None`.
pub fn parse_line(line: &str) -> Option<RobotLine> {
    let (prefix, rest) = line.trim_end().split_once(':')?;
    let f = split_fields(rest);

    match prefix {
        "CINFO" => Some(RobotLine::Cinfo {
            attr: num(&f, 0)?,
            value: text(&f, 2)?,
        }),
        "TINFO" => Some(RobotLine::Tinfo {
            title: num(&f, 0)?,
            attr: num(&f, 1)?,
            value: text(&f, 3)?,
        }),
        "SINFO" => Some(RobotLine::Sinfo {
            title: num(&f, 0)?,
            stream: num(&f, 1)?,
            attr: num(&f, 2)?,
            value: text(&f, 4)?,
        }),
        "TCOUT" => Some(RobotLine::TitleCount(num(&f, 0)?)),
        "PRGT" => Some(RobotLine::ProgressTitle(text(&f, 2)?)),
        "PRGC" => Some(RobotLine::ProgressChannel(text(&f, 2)?)),
        "PRGV" => Some(RobotLine::ProgressValue {
            current: num(&f, 0)?,
            total: num(&f, 1)?,
            max: num(&f, 2)?,
        }),
        "MSG" => Some(RobotLine::Message {
            code: num(&f, 0)?,
            text: text(&f, 3)?,
        }),
        _ => None,
    }
}
