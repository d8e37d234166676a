//! Status helper enums mapping to SMALLSERIAL/SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` / `*_types` database table.

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Look up a variant from its database ID.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Recovery task execution status.
    TaskStatus {
        Pending = 1,
        Running = 2,
        Success = 3,
        Failed = 4,
        Cancelled = 5,
        Timeout = 6,
    }
}

define_status_enum! {
    /// Data verification outcome for a completed drill.
    VerificationStatus {
        Pending = 1,
        InProgress = 2,
        Passed = 3,
        Failed = 4,
    }
}

define_status_enum! {
    /// How the drill target is reconstructed from backups.
    RestoreType {
        /// From a named backup-set snapshot artifact.
        BackupSet = 1,
        /// From a base backup plus change logs up to a timestamp.
        PointInTime = 2,
    }
}

define_status_enum! {
    /// Who or what initiates the drill.
    TaskType {
        Manual = 1,
        Scheduled = 2,
        Annual = 3,
    }
}

impl TaskStatus {
    /// Statuses that block creation of another annual drill for the same
    /// (instance, compliance year) pair.
    pub const ANNUAL_BLOCKING: [StatusId; 3] = [
        TaskStatus::Pending as StatusId,
        TaskStatus::Running as StatusId,
        TaskStatus::Success as StatusId,
    ];
}
