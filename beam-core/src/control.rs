//! Control command codec — the viewer→host input channel.
//!
//! Commands travel as single text lines of the shape
//! `control:<kind>:<args>` with a comma-separated argument list:
//!
//! ```text
//! control:mouseMove:120,45,800,600      x, y, viewportW, viewportH
//! control:mouseClick:120,45,800,600
//! control:mouseDoubleClick:120,45,800,600
//! control:mouseRightClick:120,45,800,600
//! control:mouseScroll:-3                wheel delta
//! control:keyPress:65                   key code
//! control:keyRelease:65
//! ```
//!
//! The relay passes these through untouched. The host parses them and
//! maps viewport coordinates onto its own screen before handing the
//! event to the input backend: `screen_x = x * screen_w / viewport_w`
//! (and likewise for y).

use std::fmt;

use crate::error::BeamError;

/// Line prefix identifying a control command.
pub const CONTROL_PREFIX: &str = "control:";

// ── ControlCommand ───────────────────────────────────────────────

/// One input command as sent by a viewer, still in viewport space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    MouseMove {
        x: i32,
        y: i32,
        viewport_w: u32,
        viewport_h: u32,
    },
    MouseClick {
        x: i32,
        y: i32,
        viewport_w: u32,
        viewport_h: u32,
    },
    MouseDoubleClick {
        x: i32,
        y: i32,
        viewport_w: u32,
        viewport_h: u32,
    },
    MouseRightClick {
        x: i32,
        y: i32,
        viewport_w: u32,
        viewport_h: u32,
    },
    MouseScroll {
        delta: i32,
    },
    KeyPress {
        code: u32,
    },
    KeyRelease {
        code: u32,
    },
}

impl ControlCommand {
    /// The wire name of this command's kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MouseMove { .. } => "mouseMove",
            Self::MouseClick { .. } => "mouseClick",
            Self::MouseDoubleClick { .. } => "mouseDoubleClick",
            Self::MouseRightClick { .. } => "mouseRightClick",
            Self::MouseScroll { .. } => "mouseScroll",
            Self::KeyPress { .. } => "keyPress",
            Self::KeyRelease { .. } => "keyRelease",
        }
    }

    /// Whether a text line looks like a control command.
    pub fn matches(line: &str) -> bool {
        line.starts_with(CONTROL_PREFIX)
    }

    /// Render as the wire line, `control:` prefix included.
    pub fn encode(&self) -> String {
        match self {
            Self::MouseMove {
                x,
                y,
                viewport_w,
                viewport_h,
            }
            | Self::MouseClick {
                x,
                y,
                viewport_w,
                viewport_h,
            }
            | Self::MouseDoubleClick {
                x,
                y,
                viewport_w,
                viewport_h,
            }
            | Self::MouseRightClick {
                x,
                y,
                viewport_w,
                viewport_h,
            } => format!(
                "{CONTROL_PREFIX}{}:{x},{y},{viewport_w},{viewport_h}",
                self.kind()
            ),
            Self::MouseScroll { delta } => format!("{CONTROL_PREFIX}mouseScroll:{delta}"),
            Self::KeyPress { code } => format!("{CONTROL_PREFIX}keyPress:{code}"),
            Self::KeyRelease { code } => format!("{CONTROL_PREFIX}keyRelease:{code}"),
        }
    }

    /// Parse a full wire line.
    ///
    /// Unknown kinds yield [`BeamError::UnknownCommand`]; wrong arity
    /// or non-numeric fields yield [`BeamError::MalformedCommand`].
    /// Either way the caller drops the command and keeps the channel
    /// open.
    pub fn parse(line: &str) -> Result<Self, BeamError> {
        let rest = line
            .strip_prefix(CONTROL_PREFIX)
            .ok_or_else(|| BeamError::MalformedCommand(line.to_string()))?;
        let (kind, args) = rest
            .split_once(':')
            .ok_or_else(|| BeamError::MalformedCommand(line.to_string()))?;

        match kind {
            "mouseMove" => Self::parse_pointer(args, line).map(
                |(x, y, viewport_w, viewport_h)| Self::MouseMove {
                    x,
                    y,
                    viewport_w,
                    viewport_h,
                },
            ),
            "mouseClick" => Self::parse_pointer(args, line).map(
                |(x, y, viewport_w, viewport_h)| Self::MouseClick {
                    x,
                    y,
                    viewport_w,
                    viewport_h,
                },
            ),
            "mouseDoubleClick" => Self::parse_pointer(args, line).map(
                |(x, y, viewport_w, viewport_h)| Self::MouseDoubleClick {
                    x,
                    y,
                    viewport_w,
                    viewport_h,
                },
            ),
            "mouseRightClick" => Self::parse_pointer(args, line).map(
                |(x, y, viewport_w, viewport_h)| Self::MouseRightClick {
                    x,
                    y,
                    viewport_w,
                    viewport_h,
                },
            ),
            "mouseScroll" => {
                let delta = args
                    .parse()
                    .map_err(|_| BeamError::MalformedCommand(line.to_string()))?;
                Ok(Self::MouseScroll { delta })
            }
            "keyPress" => {
                let code = args
                    .parse()
                    .map_err(|_| BeamError::MalformedCommand(line.to_string()))?;
                Ok(Self::KeyPress { code })
            }
            "keyRelease" => {
                let code = args
                    .parse()
                    .map_err(|_| BeamError::MalformedCommand(line.to_string()))?;
                Ok(Self::KeyRelease { code })
            }
            other => Err(BeamError::UnknownCommand(other.to_string())),
        }
    }

    /// Map viewport coordinates onto the target screen.
    ///
    /// Pointer commands are scaled; scroll and key commands pass
    /// through unchanged.
    pub fn resolve(&self, screen_w: u32, screen_h: u32) -> InputEvent {
        let scale = |x: i32, y: i32, vw: u32, vh: u32| {
            (
                scale_coord(x, screen_w, vw),
                scale_coord(y, screen_h, vh),
            )
        };
        match *self {
            Self::MouseMove {
                x,
                y,
                viewport_w,
                viewport_h,
            } => {
                let (x, y) = scale(x, y, viewport_w, viewport_h);
                InputEvent::MouseMove { x, y }
            }
            Self::MouseClick {
                x,
                y,
                viewport_w,
                viewport_h,
            } => {
                let (x, y) = scale(x, y, viewport_w, viewport_h);
                InputEvent::MouseClick { x, y }
            }
            Self::MouseDoubleClick {
                x,
                y,
                viewport_w,
                viewport_h,
            } => {
                let (x, y) = scale(x, y, viewport_w, viewport_h);
                InputEvent::MouseDoubleClick { x, y }
            }
            Self::MouseRightClick {
                x,
                y,
                viewport_w,
                viewport_h,
            } => {
                let (x, y) = scale(x, y, viewport_w, viewport_h);
                InputEvent::MouseRightClick { x, y }
            }
            Self::MouseScroll { delta } => InputEvent::MouseScroll { delta },
            Self::KeyPress { code } => InputEvent::KeyPress { code },
            Self::KeyRelease { code } => InputEvent::KeyRelease { code },
        }
    }

    /// Parse the 4-argument pointer shape `x,y,viewportW,viewportH`.
    fn parse_pointer(args: &str, line: &str) -> Result<(i32, i32, u32, u32), BeamError> {
        let malformed = || BeamError::MalformedCommand(line.to_string());

        let fields: Vec<&str> = args.split(',').collect();
        if fields.len() != 4 {
            return Err(malformed());
        }
        let x: i32 = fields[0].parse().map_err(|_| malformed())?;
        let y: i32 = fields[1].parse().map_err(|_| malformed())?;
        let viewport_w: u32 = fields[2].parse().map_err(|_| malformed())?;
        let viewport_h: u32 = fields[3].parse().map_err(|_| malformed())?;
        if viewport_w == 0 || viewport_h == 0 {
            return Err(malformed());
        }
        Ok((x, y, viewport_w, viewport_h))
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// `coord * screen / viewport`, truncating.
fn scale_coord(coord: i32, screen: u32, viewport: u32) -> i32 {
    (coord as i64 * screen as i64 / viewport as i64) as i32
}

// ── InputEvent ───────────────────────────────────────────────────

/// A control command resolved to screen space — what the input
/// backend actually executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    MouseMove { x: i32, y: i32 },
    MouseClick { x: i32, y: i32 },
    MouseDoubleClick { x: i32, y: i32 },
    MouseRightClick { x: i32, y: i32 },
    MouseScroll { delta: i32 },
    KeyPress { code: u32 },
    KeyRelease { code: u32 },
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_parses_without_scaling() {
        let cmd = ControlCommand::parse("control:mouseScroll:-3").unwrap();
        assert_eq!(cmd, ControlCommand::MouseScroll { delta: -3 });
        assert_eq!(
            cmd.resolve(1920, 1080),
            InputEvent::MouseScroll { delta: -3 }
        );
    }

    #[test]
    fn encode_parse_roundtrip_all_kinds() {
        let cmds = [
            ControlCommand::MouseMove {
                x: 120,
                y: 45,
                viewport_w: 800,
                viewport_h: 600,
            },
            ControlCommand::MouseClick {
                x: 0,
                y: 0,
                viewport_w: 1,
                viewport_h: 1,
            },
            ControlCommand::MouseDoubleClick {
                x: 799,
                y: 599,
                viewport_w: 800,
                viewport_h: 600,
            },
            ControlCommand::MouseRightClick {
                x: 10,
                y: 20,
                viewport_w: 640,
                viewport_h: 480,
            },
            ControlCommand::MouseScroll { delta: 7 },
            ControlCommand::KeyPress { code: 65 },
            ControlCommand::KeyRelease { code: 65 },
        ];
        for cmd in cmds {
            assert_eq!(ControlCommand::parse(&cmd.encode()).unwrap(), cmd);
        }
    }

    #[test]
    fn unknown_kind_reported() {
        let err = ControlCommand::parse("control:mouseTripleClick:1,2,3,4").unwrap_err();
        assert!(matches!(err, BeamError::UnknownCommand(k) if k == "mouseTripleClick"));
    }

    #[test]
    fn wrong_arity_reported() {
        assert!(matches!(
            ControlCommand::parse("control:mouseMove:1,2,3"),
            Err(BeamError::MalformedCommand(_))
        ));
        assert!(matches!(
            ControlCommand::parse("control:mouseScroll:1,2"),
            Err(BeamError::MalformedCommand(_))
        ));
    }

    #[test]
    fn non_numeric_fields_reported() {
        assert!(matches!(
            ControlCommand::parse("control:mouseMove:a,2,3,4"),
            Err(BeamError::MalformedCommand(_))
        ));
        assert!(matches!(
            ControlCommand::parse("control:keyPress:enter"),
            Err(BeamError::MalformedCommand(_))
        ));
    }

    #[test]
    fn missing_args_reported() {
        assert!(matches!(
            ControlCommand::parse("control:mouseMove"),
            Err(BeamError::MalformedCommand(_))
        ));
    }

    #[test]
    fn zero_viewport_reported() {
        assert!(matches!(
            ControlCommand::parse("control:mouseClick:1,2,0,600"),
            Err(BeamError::MalformedCommand(_))
        ));
    }

    #[test]
    fn pointer_scaling() {
        let cmd = ControlCommand::MouseMove {
            x: 400,
            y: 300,
            viewport_w: 800,
            viewport_h: 600,
        };
        assert_eq!(
            cmd.resolve(1920, 1080),
            InputEvent::MouseMove { x: 960, y: 540 }
        );
    }

    #[test]
    fn scaling_truncates() {
        // 333 * 1920 / 800 = 799.2 → 799
        let cmd = ControlCommand::MouseClick {
            x: 333,
            y: 1,
            viewport_w: 800,
            viewport_h: 600,
        };
        let InputEvent::MouseClick { x, y } = cmd.resolve(1920, 1080) else {
            panic!("wrong event kind");
        };
        assert_eq!(x, 799);
        assert_eq!(y, 1);
    }

    #[test]
    fn display_matches_wire_line() {
        let cmd = ControlCommand::KeyPress { code: 13 };
        assert_eq!(cmd.to_string(), "control:keyPress:13");
        assert!(ControlCommand::matches(&cmd.to_string()));
    }
}
