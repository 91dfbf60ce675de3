use crate::{
    backend::CodegenOptions,
    middle::{
        quads::QuadList,
        symbol_table::{SymbolId, SymbolTable},
    },
};

mod x86_64_linux_gnu;

pub trait CodeGenerator {
    /// Expands the quads of one procedure or function body into assembly,
    /// prologue and epilogue included
    fn generate_body(
        &self,
        symbols: &mut SymbolTable,
        environment: SymbolId,
        quads: &QuadList,
        options: &CodegenOptions,
    ) -> String;

    /// Wraps the generated bodies into a complete program: entry point,
    /// user code and the glue for the predefined callables
    fn translate_to_asm(&self, symbols: &SymbolTable, program: SymbolId, bodies: &[String]) -> String;
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString)]
pub enum Target {
    #[default]
    #[strum(serialize = "x86_64-linux-gnu")]
    x86_64LinuxGnu,
}

impl Target {
    pub fn get_code_generator(self) -> impl CodeGenerator {
        match self {
            Target::x86_64LinuxGnu => x86_64_linux_gnu::CodeGeneratorX86_64LinuxGnu,
        }
    }
}
