// Importrr Constants
// Defaults applied when the configuration file leaves a key out.

// Quiescence
pub const DEFAULT_TIME_CUTOFF_MINUTES: i64 = 2;

// Work directory names and archive prefixes are derived from the cutoff instant
pub const RUN_PREFIX_FORMAT: &str = "%Y%m%d%H%M%S";

// Archival
pub const DEFAULT_ARCHIVE_SIZE_CAP: u64 = 4 * 1024 * 1024 * 1024; // 4 GiB
pub const ARCHIVE_EXTENSION: &str = "tar";
pub const ARCHIVE_LOCK_FILENAME: &str = "write.lock";

// Transcoding
pub const RAW_VIDEO_EXTENSIONS: [&str; 1] = ["mov"];
pub const NORMALIZED_VIDEO_EXTENSION: &str = "mp4";
pub const MAX_NAME_SUFFIX: u32 = 999;
pub const FFMPEG_PARAMS: [&str; 14] = [
    "-c:v", "libx264",
    "-preset", "slower",
    "-crf", "20",
    "-c:a", "aac",
    "-b:a", "160k",
    "-vf", "format=yuv420p",
    "-movflags", "+faststart",
];

// Organizer
pub const REPORT_SEPARATOR: &str = " --> ";
pub const ORGANIZE_FILENAME_TEMPLATE: &str =
    "-filename<${DateTimeOriginal#;DateFmt(\"%Y/%m\")}/$DateTimeOriginal%-c.%e";
pub const ORGANIZE_DATE_FORMAT: &str = "%Y%m%d-%H%M%S";
pub const BACKFILL_EXTENSIONS: [&str; 3] = ["3GP", "MOV", "MP4"];

// Configuration
pub const CONFIG_FILENAME: &str = "importrr.toml";
pub const CONFIG_CANDIDATES: [&str; 2] = ["importrr.toml", "/config/importrr.toml"];
pub const CONFIG_ENV_PREFIX: &str = "IMPORTRR_";
