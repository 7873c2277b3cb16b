strong_type!(Handle, u64);
strong_type!(FsId, u32);
strong_type!(ServerId, u32);
