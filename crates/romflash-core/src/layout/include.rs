//! Region include arguments (`name[:file]`)

use std::path::PathBuf;
use std::str::FromStr;

use super::{Layout, LayoutError};

/// One `-i name[:file]` argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeArg {
    /// Region name
    pub name: String,
    /// File for partial I/O of the region
    pub file: Option<PathBuf>,
}

impl FromStr for IncludeArg {
    type Err = LayoutError;

    /// Split at the first colon; the region name may not be empty and a
    /// trailing colon must be followed by a file name.
    fn from_str(arg: &str) -> Result<Self, Self::Err> {
        let (name, file) = match arg.split_once(':') {
            Some((_, "")) => return Err(LayoutError::EmptyIncludeFile(arg.to_string())),
            Some((name, file)) => (name, Some(PathBuf::from(file))),
            None => (arg, None),
        };
        if name.is_empty() {
            return Err(LayoutError::EmptyRegionName(arg.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            file,
        })
    }
}

/// Ordered set of include arguments with unique region names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeArgs {
    args: Vec<IncludeArg>,
}

impl IncludeArgs {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and register every argument
    pub fn parse_all<I, S>(args: I) -> Result<Self, LayoutError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for arg in args {
            set.register(arg.as_ref().parse()?)?;
        }
        Ok(set)
    }

    /// Add an argument, rejecting a second mention of the same region
    pub fn register(&mut self, arg: IncludeArg) -> Result<(), LayoutError> {
        if self.args.iter().any(|a| a.name == arg.name) {
            return Err(LayoutError::DuplicateInclude(arg.name));
        }
        self.args.push(arg);
        Ok(())
    }

    /// Registered arguments, in order
    pub fn iter(&self) -> impl Iterator<Item = &IncludeArg> {
        self.args.iter()
    }

    /// Whether no argument was given
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Number of arguments
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Require every argument to name a file
    ///
    /// Used when the operation has no file of its own, so partial I/O is
    /// the only source or destination of data.
    pub fn check_files(&self) -> Result<(), LayoutError> {
        match self.args.iter().find(|a| a.file.is_none()) {
            Some(arg) => Err(LayoutError::MissingIncludeFile(arg.name.clone())),
            None => Ok(()),
        }
    }

    /// Mark the named regions as included
    ///
    /// Every name must exist in `layout`. Nothing is changed on error.
    pub fn apply(&self, layout: &mut Layout) -> Result<(), LayoutError> {
        if self.args.is_empty() {
            return Ok(());
        }
        if let Some(missing) = self.args.iter().find(|a| layout.find_region(&a.name).is_none()) {
            return Err(LayoutError::RegionNotFound(missing.name.clone()));
        }

        for arg in &self.args {
            layout.include_region(&arg.name, arg.file.clone())?;
        }
        let names: Vec<String> = self.args.iter().map(|a| format!("\"{}\"", a.name)).collect();
        log::info!("Using region(s): {}.", names.join(", "));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Region;

    #[test]
    fn test_parse_include_arg() {
        let arg: IncludeArg = "bios".parse().unwrap();
        assert_eq!(arg.name, "bios");
        assert_eq!(arg.file, None);

        let arg: IncludeArg = "bios:out/bios.bin".parse().unwrap();
        assert_eq!(arg.file, Some(PathBuf::from("out/bios.bin")));

        // Only the first colon separates
        let arg: IncludeArg = "me:C:/me.bin".parse().unwrap();
        assert_eq!(arg.name, "me");
        assert_eq!(arg.file, Some(PathBuf::from("C:/me.bin")));

        assert!(matches!("".parse::<IncludeArg>(), Err(LayoutError::EmptyRegionName(_))));
        assert!(matches!(":x.bin".parse::<IncludeArg>(), Err(LayoutError::EmptyRegionName(_))));
        assert!(matches!("bios:".parse::<IncludeArg>(), Err(LayoutError::EmptyIncludeFile(_))));
    }

    #[test]
    fn test_duplicates_rejected() {
        assert!(matches!(
            IncludeArgs::parse_all(["bios", "me", "bios:b.bin"]),
            Err(LayoutError::DuplicateInclude(name)) if name == "bios"
        ));
    }

    #[test]
    fn test_check_files() {
        let args = IncludeArgs::parse_all(["a:a.bin", "b:b.bin"]).unwrap();
        assert!(args.check_files().is_ok());

        let args = IncludeArgs::parse_all(["a:a.bin", "b"]).unwrap();
        assert!(matches!(
            args.check_files(),
            Err(LayoutError::MissingIncludeFile(name)) if name == "b"
        ));
    }

    #[test]
    fn test_apply() {
        let mut layout = Layout::new();
        layout.add_region(Region::new("a", 0, 0xFFF));
        layout.add_region(Region::new("b", 0x1000, 0x1FFF));

        let args = IncludeArgs::parse_all(["b:b.bin"]).unwrap();
        args.apply(&mut layout).unwrap();
        assert!(!layout.regions[0].included);
        assert!(layout.regions[1].included);
        assert_eq!(layout.regions[1].file, Some(PathBuf::from("b.bin")));

        let args = IncludeArgs::parse_all(["a", "nope"]).unwrap();
        assert!(matches!(
            args.apply(&mut layout),
            Err(LayoutError::RegionNotFound(name)) if name == "nope"
        ));
        assert!(!layout.regions[0].included);
    }
}
