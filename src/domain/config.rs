//! Notifier domain configuration

use crate::refcount::DEFAULT_GROUP_SIZE;

/// Configuration for a [`NotifierDomain`](super::NotifierDomain)
#[derive(Debug, Clone)]
pub struct DomainConfig {
    /// Number of pooled mutexes shared by subscription handles
    pub reference_group_size: usize,

    /// Initial capacity of the package list
    pub package_capacity: usize,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            reference_group_size: DEFAULT_GROUP_SIZE,
            package_capacity: 8,
        }
    }
}

impl DomainConfig {
    /// Set the reference counter group size (minimum 1)
    pub fn reference_group_size(mut self, size: usize) -> Self {
        self.reference_group_size = size.max(1);
        self
    }

    /// Set the initial package capacity
    pub fn package_capacity(mut self, capacity: usize) -> Self {
        self.package_capacity = capacity;
        self
    }
}
