use crate::motion::{Instruction, MoveStream};
use crate::types::{GCode, Move, Units};

/// Serialize an emitted program to Grbl-compatible G-code.
///
/// Feed words are modal: `F` is written only when the rate changes.
pub fn post_process(stream: &MoveStream) -> GCode {
    let mut lines = Vec::with_capacity(stream.instructions.len());
    let mut feed: Option<f64> = None;

    for instruction in &stream.instructions {
        match instruction {
            Instruction::Comment(text) => lines.push(format!("; {}", text)),
            Instruction::Units(Units::Millimeters) => lines.push("G21".to_string()),
            Instruction::Units(Units::Inches) => lines.push("G20".to_string()),
            Instruction::AbsolutePositioning => lines.push("G90".to_string()),
            Instruction::PlaneXY => lines.push("G17".to_string()),
            Instruction::ToolOn { power: Some(power) } => {
                lines.push(format!("M3 S{}", fmt_feed(*power)))
            }
            Instruction::ToolOn { power: None } => lines.push("M3".to_string()),
            Instruction::ToolOff => lines.push("M5".to_string()),
            Instruction::Feed(rate) => {
                lines.push(format!("F{}", fmt_feed(*rate)));
                feed = Some(*rate);
            }
            Instruction::Motion(m) => lines.push(motion_line(m, &mut feed)),
            Instruction::ProgramEnd => lines.push("M2".to_string()),
        }
    }

    GCode { lines }
}

fn motion_line(m: &Move, modal_feed: &mut Option<f64>) -> String {
    match *m {
        Move::Rapid { to, .. } => format!("G0 X{} Y{}", fmt_coord(to.x), fmt_coord(to.y)),
        Move::Retract { z } => format!("G0 Z{}", fmt_coord(z)),
        Move::Plunge { z, feed } => {
            format!("G1 Z{}{}", fmt_coord(z), feed_word(feed, modal_feed))
        }
        Move::Cut { to, feed } => format!(
            "G1 X{} Y{}{}",
            fmt_coord(to.x),
            fmt_coord(to.y),
            feed_word(feed, modal_feed)
        ),
    }
}

fn feed_word(feed: f64, modal_feed: &mut Option<f64>) -> String {
    if *modal_feed == Some(feed) {
        return String::new();
    }
    *modal_feed = Some(feed);
    format!(" F{}", fmt_feed(feed))
}

fn fmt_coord(value: f64) -> String {
    let text = format!("{:.3}", value);
    if text == "-0.000" {
        "0.000".to_string()
    } else {
        text
    }
}

fn fmt_feed(value: f64) -> String {
    format!("{:.1}", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    fn stream(instructions: Vec<Instruction>) -> MoveStream {
        MoveStream { instructions }
    }

    #[test]
    fn test_header_words() {
        let gcode = post_process(&stream(vec![
            Instruction::Comment("part".to_string()),
            Instruction::Units(Units::Inches),
            Instruction::AbsolutePositioning,
            Instruction::PlaneXY,
            Instruction::ToolOn { power: Some(200.0) },
            Instruction::ToolOn { power: None },
        ]));
        assert_eq!(gcode.lines, vec!["; part", "G20", "G90", "G17", "M3 S200.0", "M3"]);
    }

    #[test]
    fn test_feed_word_is_modal() {
        let p = Point::new(1.0, 2.0);
        let gcode = post_process(&stream(vec![
            Instruction::Feed(150.0),
            Instruction::Motion(Move::Plunge { z: -1.0, feed: 50.0 }),
            Instruction::Motion(Move::Cut { to: p, feed: 150.0 }),
            Instruction::Motion(Move::Cut { to: p, feed: 150.0 }),
        ]));
        assert_eq!(
            gcode.lines,
            vec![
                "F150.0",
                "G1 Z-1.000 F50.0",
                "G1 X1.000 Y2.000 F150.0",
                "G1 X1.000 Y2.000",
            ]
        );
    }

    #[test]
    fn test_negative_zero_normalized() {
        let gcode = post_process(&stream(vec![
            Instruction::Motion(Move::Rapid {
                to: Point::new(-0.0001, 3.0),
                z: 10.0,
            }),
            Instruction::Motion(Move::Plunge { z: -0.0, feed: 50.0 }),
        ]));
        assert_eq!(gcode.lines[0], "G0 X0.000 Y3.000");
        assert_eq!(gcode.lines[1], "G1 Z0.000 F50.0");
    }

    #[test]
    fn test_retract_and_program_end() {
        let gcode = post_process(&stream(vec![
            Instruction::Motion(Move::Retract { z: 10.0 }),
            Instruction::ToolOff,
            Instruction::ProgramEnd,
        ]));
        assert_eq!(gcode.lines, vec!["G0 Z10.000", "M5", "M2"]);
    }
}
