use std::path::Path;

/// Glyph used to fill the elapsed part of the progress line.
pub const PROGRESS_GLYPH: char = '-';

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TitleStyle {
    #[default]
    Plain,
    Morse,
}

/// Title line for a source, derived from its file name.
pub fn title_for(source: &Path, style: TitleStyle) -> String {
    let name = source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.display().to_string());

    match style {
        TitleStyle::Plain => name,
        TitleStyle::Morse => to_morse(&name),
    }
}

/// Morse encodes letters and digits; anything else passes through unchanged.
pub fn to_morse(text: &str) -> String {
    let symbols: Vec<String> = text
        .chars()
        .map(|ch| match morse_symbol(ch.to_ascii_uppercase()) {
            Some(code) => code.to_owned(),
            None => ch.to_string(),
        })
        .collect();
    symbols.join(" ")
}

fn morse_symbol(ch: char) -> Option<&'static str> {
    let code = match ch {
        'A' => ".-",
        'B' => "-...",
        'C' => "-.-.",
        'D' => "-..",
        'E' => ".",
        'F' => "..-.",
        'G' => "--.",
        'H' => "....",
        'I' => "..",
        'J' => ".---",
        'K' => "-.-",
        'L' => ".-..",
        'M' => "--",
        'N' => "-.",
        'O' => "---",
        'P' => ".--.",
        'Q' => "--.-",
        'R' => ".-.",
        'S' => "...",
        'T' => "-",
        'U' => "..-",
        'V' => "...-",
        'W' => ".--",
        'X' => "-..-",
        'Y' => "-.--",
        'Z' => "--..",
        '1' => ".----",
        '2' => "..---",
        '3' => "...--",
        '4' => "....-",
        '5' => ".....",
        '6' => "-....",
        '7' => "--...",
        '8' => "---..",
        '9' => "----.",
        '0' => "-----",
        _ => return None,
    };
    Some(code)
}

/// Progress line exactly `width` glyphs wide.
pub fn progress_line(fraction: f64, width: u16) -> String {
    let width = usize::from(width);
    let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
    let filled = ((fraction * width as f64) as usize).min(width);

    let mut line = String::with_capacity(width);
    line.extend(std::iter::repeat(PROGRESS_GLYPH).take(filled));
    line.extend(std::iter::repeat(' ').take(width - filled));
    line
}
