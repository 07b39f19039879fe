/// Bot behavior flags — bit values match the sequential numbering of the
/// original `eBotFlags` enum (`Moving` is bit 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum BotFlag {
    Moving = 1 << 0,
    Dead = 1 << 1,
    Driving = 1 << 2,
    Aiming = 1 << 3,
    Reloading = 1 << 4,
    Shooting = 1 << 5,
    Jacking = 1 << 6,
    Exiting = 1 << 7,
    Playing = 1 << 8,
    MeleeAttack = 1 << 9,
    Unmoving = 1 << 10,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BotFlags(u32);

impl BotFlags {
    pub fn get(&self, flag: BotFlag) -> bool {
        self.0 & (flag as u32) != 0
    }

    pub fn set(&mut self, flag: BotFlag) {
        self.0 |= flag as u32;
    }

    pub fn clear(&mut self, flag: BotFlag) {
        self.0 &= !(flag as u32);
    }

    pub fn toggle(&mut self, flag: BotFlag) {
        self.0 ^= flag as u32;
    }

    pub fn set_to(&mut self, flag: BotFlag, value: bool) {
        if value {
            self.set(flag);
        } else {
            self.clear(flag);
        }
    }
}

/// Movement style requested of `go()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveType {
    Auto,
    Walk,
    Run,
    Sprint,
    Drive,
}

/// Movepath playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MovepathStatus {
    #[default]
    Inactive,
    Active,
    Paused,
    Completed,
}

/// An in-flight dialog box presented by the server.
#[derive(Debug, Clone)]
pub struct Dialog {
    pub id: i32,
    pub style: DialogStyle,
    pub title: String,
    pub body: String,
    pub left_label: String,
    pub right_label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogStyle {
    MsgBox,
    Input,
    Password,
    List,
    TabList,
    TabListHeaders,
}

impl DialogStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            DialogStyle::MsgBox => "msgbox",
            DialogStyle::Input => "input",
            DialogStyle::Password => "password",
            DialogStyle::List => "list",
            DialogStyle::TabList => "tablist",
            DialogStyle::TabListHeaders => "tablist_headers",
        }
    }
}
