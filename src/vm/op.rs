//! # Instruction set.
//!
//! Stack effects are written `before -- after`, top of stack rightmost.
//! Addresses travel on the stack as heap strings.
//!
//! | Op              | Effect                                   | Notes                                           |
//! |-----------------|------------------------------------------|-------------------------------------------------|
//! | `Nop`           | `--`                                     |                                                 |
//! | `PushNil`       | `-- nil`                                 |                                                 |
//! | `PushInt(n)`    | `-- n`                                   |                                                 |
//! | `PushStr(i)`    | `-- str`                                 | constant string `i`                             |
//! | `PushMsg(i)`    | `-- msg`                                 | constant message `i`                            |
//! | `PushTemplate(i)` | `-- tpl`                               | constant template `i`                           |
//! | `PushFun(i)`    | `-- fun`                                 | constant function `i`                           |
//! | `PushSelf`      | `-- addr`                                | executing actor                                 |
//! | `Pop` / `Dup`   | `a --` / `a -- a a`                      |                                                 |
//! | `Load(i)` / `Store(i)` | `-- v` / `v --`                   | frame locals                                    |
//! | `Jump(t)`       | `--`                                     | absolute target, no post-jump advance           |
//! | `JumpIfZero(t)` / `JumpIfOne(t)` | `n --`                  | jump when `n == 0` / `n == 1`                   |
//! | `Call(argc)`    | `a1 .. an fun -- ret`                    | VM or foreign function                          |
//! | `Ret`           | `v --` (frame popped)                    | falling off the code is an implicit `Ret`       |
//! | `Alloc`         | `tpl -- addr`                            | allocate under self (not started)               |
//! | `Run`           | `addr --`                                | start an allocated actor                        |
//! | `Send`          | `msg to -- 1/0`                          | 0 when the target is unknown                    |
//! | `Drop`          | `msg to --`                              | records a drop                                  |
//! | `Recv(i)`       | `--`                                     | arm receiver with constant matcher `i`          |
//! | `RecvCount`     | `-- n`                                   | armed receivers                                 |
//! | `MailCount`     | `-- n`                                   | mailbox length                                  |
//! | `MailDq`        | `-- msg`                                 | dequeue head (nil when empty)                   |
//! | `Read`          | `-- 1/0`                                 | match head against top receiver, receive on hit |
//! | `Discard`       | `--`                                     | drop mailbox head                               |
//! | `Kill`          | `addr --`                                | self or descendant only                         |
//! | `Raise`         | `msg --`                                 | raise an application error, halts the script    |
//! | `Route` / `Unroute` | `addr --`                            | route subtree to self / remove route            |

/// One VM instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instr {
    Nop,
    PushNil,
    PushInt(i64),
    PushStr(u32),
    PushMsg(u32),
    PushTemplate(u32),
    PushFun(u32),
    PushSelf,
    Pop,
    Dup,
    Load(u16),
    Store(u16),
    Jump(usize),
    JumpIfZero(usize),
    JumpIfOne(usize),
    Call(u8),
    Ret,
    Alloc,
    Run,
    Send,
    Drop,
    Recv(u32),
    RecvCount,
    MailCount,
    MailDq,
    Read,
    Discard,
    Kill,
    Raise,
    Route,
    Unroute,
}

impl Instr {
    /// Lowercase mnemonic, used in traces and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Instr::Nop => "nop",
            Instr::PushNil => "push_nil",
            Instr::PushInt(_) => "push_int",
            Instr::PushStr(_) => "push_str",
            Instr::PushMsg(_) => "push_msg",
            Instr::PushTemplate(_) => "push_template",
            Instr::PushFun(_) => "push_fun",
            Instr::PushSelf => "push_self",
            Instr::Pop => "pop",
            Instr::Dup => "dup",
            Instr::Load(_) => "load",
            Instr::Store(_) => "store",
            Instr::Jump(_) => "jump",
            Instr::JumpIfZero(_) => "jump_if_zero",
            Instr::JumpIfOne(_) => "jump_if_one",
            Instr::Call(_) => "call",
            Instr::Ret => "ret",
            Instr::Alloc => "alloc",
            Instr::Run => "run",
            Instr::Send => "send",
            Instr::Drop => "drop",
            Instr::Recv(_) => "recv",
            Instr::RecvCount => "recv_count",
            Instr::MailCount => "mail_count",
            Instr::MailDq => "mail_dq",
            Instr::Read => "read",
            Instr::Discard => "discard",
            Instr::Kill => "kill",
            Instr::Raise => "raise",
            Instr::Route => "route",
            Instr::Unroute => "unroute",
        }
    }
}
