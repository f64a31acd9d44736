use std::fmt;

/// Wire type of a telecommand parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    U8,
    U16,
    U32,
    I8,
    I16,
    I32,
    F32,
}

impl ParamType {
    /// Longest textual form a value of this type may take on the wire.
    ///
    /// Integers: digits of the extreme value, plus sign for signed types.
    /// Floats: a fixed 15 characters.
    pub const fn max_chars(self) -> usize {
        match self {
            Self::U8 => 3,
            Self::U16 => 5,
            Self::U32 => 10,
            Self::I8 => 4,
            Self::I16 => 6,
            Self::I32 => 11,
            Self::F32 => 15,
        }
    }

    /// Short type name, as used in diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::F32 => "f32",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A run of `count` identically typed parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub ty: ParamType,
    pub count: u8,
}

impl FieldSpec {
    /// A single parameter.
    pub const fn one(ty: ParamType) -> Self {
        Self { ty, count: 1 }
    }

    /// `count` consecutive parameters of the same type.
    pub const fn repeated(ty: ParamType, count: u8) -> Self {
        Self { ty, count }
    }
}

/// Parameter layout of one telecommand id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub id: u8,
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

impl CommandSpec {
    pub const fn new(id: u8, name: &'static str, fields: &'static [FieldSpec]) -> Self {
        Self { id, name, fields }
    }

    /// Total number of parameters following the id.
    pub fn param_count(&self) -> usize {
        self.fields.iter().map(|field| usize::from(field.count)).sum()
    }
}

/// Static table mapping telecommand ids to their parameter layout.
///
/// Ids missing from the table carry no parameters.
#[derive(Debug, Clone, Copy)]
pub struct ParameterSchema {
    commands: &'static [CommandSpec],
}

impl ParameterSchema {
    pub const fn new(commands: &'static [CommandSpec]) -> Self {
        Self { commands }
    }

    /// Look up the layout for `id`.
    pub fn lookup(&self, id: u8) -> Option<&'static CommandSpec> {
        self.commands.iter().find(|command| command.id == id)
    }

    /// Every command in table order.
    pub fn commands(&self) -> &'static [CommandSpec] {
        self.commands
    }

    /// Number of parameters scheduled for `id` (zero when unknown).
    pub fn param_count(&self, id: u8) -> usize {
        self.lookup(id).map_or(0, CommandSpec::param_count)
    }
}

const F32_1: &[FieldSpec] = &[FieldSpec::one(ParamType::F32)];
const U8_1: &[FieldSpec] = &[FieldSpec::one(ParamType::U8)];
const U16_1: &[FieldSpec] = &[FieldSpec::one(ParamType::U16)];
const U32_1: &[FieldSpec] = &[FieldSpec::one(ParamType::U32)];
const NONE: &[FieldSpec] = &[];
// bin count followed by the full set of bin edges
const BINS: &[FieldSpec] = &[
    FieldSpec::one(ParamType::U8),
    FieldSpec::repeated(ParamType::U8, 24),
];

const STRATEOLE_COMMANDS: &[CommandSpec] = &[
    // MCB motion
    CommandSpec::new(1, "DEPLOYx", F32_1),
    CommandSpec::new(2, "DEPLOYv", F32_1),
    CommandSpec::new(3, "DEPLOYa", F32_1),
    CommandSpec::new(4, "RETRACTx", F32_1),
    CommandSpec::new(5, "RETRACTv", F32_1),
    CommandSpec::new(6, "RETRACTa", F32_1),
    CommandSpec::new(7, "DOCKx", F32_1),
    CommandSpec::new(8, "DOCKv", F32_1),
    CommandSpec::new(9, "DOCKa", F32_1),
    CommandSpec::new(10, "FULLRETRACT", NONE),
    CommandSpec::new(11, "CANCELMOTION", NONE),
    CommandSpec::new(12, "ZEROREEL", NONE),
    // DIB
    CommandSpec::new(62, "MINBATVOLT", F32_1),
    CommandSpec::new(63, "FIBERSWITCH", U8_1),
    CommandSpec::new(64, "EFUPERIOD", U16_1),
    CommandSpec::new(65, "EFUTIME", U8_1),
    CommandSpec::new(66, "FTRPOWER", U8_1),
    CommandSpec::new(67, "ETHERNETRESET", NONE),
    CommandSpec::new(68, "FTRONTIME", U16_1),
    CommandSpec::new(69, "FTRCYCLETIME", U16_1),
    // LPC
    CommandSpec::new(100, "SETMODE", U8_1),
    CommandSpec::new(101, "SETSAMPLE", U16_1),
    CommandSpec::new(102, "SETWARMUPTIME", U16_1),
    CommandSpec::new(103, "SETCYCLETIME", U8_1),
    CommandSpec::new(104, "GETFILE", U32_1),
    CommandSpec::new(105, "SETHGBINS", BINS),
    CommandSpec::new(106, "SETLGBINS", BINS),
    CommandSpec::new(107, "SETLASERTEMP", U8_1),
    CommandSpec::new(108, "SETHKPERIOD", U8_1),
    CommandSpec::new(109, "SETFLUSH", U8_1),
    CommandSpec::new(110, "SETSAMPLEAVG", U16_1),
    // RACHuTS
    CommandSpec::new(130, "SETAUTO", NONE),
    CommandSpec::new(131, "SETMANUAL", NONE),
    CommandSpec::new(132, "SETSZAMIN", F32_1),
    CommandSpec::new(133, "SETPROFILESIZE", F32_1),
    CommandSpec::new(134, "SETDOCKAMOUNT", F32_1),
    CommandSpec::new(135, "SETDWELLTIME", U16_1),
    CommandSpec::new(136, "SETPROFILEPERIOD", U16_1),
    CommandSpec::new(137, "SETNUMPROFILES", U8_1),
    CommandSpec::new(138, "USESZATRIGGER", NONE),
    CommandSpec::new(139, "USETIMETRIGGER", NONE),
    CommandSpec::new(140, "SETTIMETRIGGER", U32_1),
    CommandSpec::new(141, "SETDOCKOVERSHOOT", F32_1),
    // generic
    CommandSpec::new(200, "RESET_INST", NONE),
    CommandSpec::new(201, "EXITERROR", NONE),
];

/// Telecommands understood by the Strateole 2 instrument family.
pub static STRATEOLE_SCHEMA: ParameterSchema = ParameterSchema::new(STRATEOLE_COMMANDS);
