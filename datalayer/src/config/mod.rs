//! 설정 모듈
//!
//! 연결 문자열 해석과 연결 관리자 동작 설정을 담당합니다.

pub mod connection_string;
pub mod options;

pub use connection_string::{
    load_dotenv, ConnectionDescriptor, ConnectionStringSource, EnvConnectionStrings,
    MemoryConnectionStrings,
};
pub use options::{ManagerOptions, NestedBegin};
