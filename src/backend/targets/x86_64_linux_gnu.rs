use itertools::Itertools;

use crate::{
    backend::{
        CodegenOptions,
        assemblers::x86_64::{Assembler, Register},
        targets::CodeGenerator,
    },
    middle::{
        quads::{Operand, QuadList, QuadOp, Quadruple, pretty_print::format_quad},
        symbol_table::{SymbolId, SymbolTable, WORD_SIZE},
    },
};

pub struct CodeGeneratorX86_64LinuxGnu;

impl CodeGenerator for CodeGeneratorX86_64LinuxGnu {
    fn generate_body(
        &self,
        symbols: &mut SymbolTable,
        environment: SymbolId,
        quads: &QuadList,
        options: &CodegenOptions,
    ) -> String {
        let mut assembler = Assembler::new(symbols);

        assembler.function_prologue(environment, options.trace);

        for (index, quad) in quads.iter().enumerate() {
            // Labels go first so that a jump never skips the trace comment
            if quad.op == QuadOp::Labl {
                assembler.label(quad.first.label());
            }

            if options.trace {
                let row = strip_ansi_escapes::strip_str(format_quad(assembler.symbols(), quad));
                assembler.comment(format!("QUAD {}: {}", index + 1, row.trim_start()));
            }

            expand_quad(&mut assembler, quad);
        }

        assembler.function_epilogue(environment, options.trace);

        assembler.into_output()
    }

    fn translate_to_asm(&self, symbols: &SymbolTable, program: SymbolId, bodies: &[String]) -> String {
        let builtins = symbols.builtins();
        let program_label = symbols[program].callable().label;
        let label_of = |symbol: SymbolId| symbols[symbol].callable().label;

        format!(
            indoc::indoc! {r#"
                	.intel_syntax noprefix
                	.text
                	.globl main

                # program entrypoint
                main:
                		push rbp
                		mov rbp, rsp
                		call {0}	# {1}
                		mov rax, 0
                		pop rbp
                		ret

                # user code
                {2}
                # predefined procedures and functions
                {3}:			# read
                		push rbp
                		mov rbp, rsp
                		and rsp, -16
                		call mygetchar
                		movsxd rax, eax
                		leave
                		ret
                {4}:			# write
                		push rbp
                		mov rbp, rsp
                		mov rdi, [rbp+16]
                		and rsp, -16
                		call myputchar
                		leave
                		ret
                {5}:			# trunc
                		push rbp
                		mov rbp, rsp
                		cvttsd2si rax, qword ptr [rbp+16]
                		leave
                		ret

                	.section .note.GNU-stack,"",@progbits
            "#},
            program_label,
            symbols.name(program),
            bodies.iter().join("\n"),
            label_of(builtins.read),
            label_of(builtins.write),
            label_of(builtins.trunc),
        )
    }
}

/// Expands a single quad. Every operand is reloaded from memory, `rcx` is
/// clobbered by every memory access.
fn expand_quad(assembler: &mut Assembler, quad: &Quadruple) {
    match quad.op {
        QuadOp::Rload | QuadOp::Iload => {
            assembler.emit(format!("mov {}, {}", Register::Rax, quad.first.immediate()));
            assembler.store(Register::Rax, quad.third.symbol());
        }
        QuadOp::Inot => {
            assembler.fetch(quad.first.symbol(), Register::Rax);
            assembler.emit("cmp rax, 0");
            emit_boolean_result(assembler, "je", quad.third.symbol());
        }
        QuadOp::Ruminus => {
            assembler.fetch_float(quad.first.symbol());
            assembler.emit("fchs");
            assembler.store_float(quad.third.symbol());
        }
        QuadOp::Iuminus => {
            assembler.fetch(quad.first.symbol(), Register::Rax);
            assembler.emit("neg rax");
            assembler.store(Register::Rax, quad.third.symbol());
        }
        QuadOp::Rplus | QuadOp::Rminus | QuadOp::Rmult | QuadOp::Rdivide => {
            let instruction = match quad.op {
                QuadOp::Rplus => "faddp",
                QuadOp::Rminus => "fsubp",
                QuadOp::Rmult => "fmulp",
                _ => "fdivp",
            };

            assembler.fetch_float(quad.first.symbol());
            assembler.fetch_float(quad.second.symbol());
            assembler.emit(instruction);
            assembler.store_float(quad.third.symbol());
        }
        QuadOp::Iplus | QuadOp::Iminus | QuadOp::Imult => {
            let instruction = match quad.op {
                QuadOp::Iplus => "add",
                QuadOp::Iminus => "sub",
                _ => "imul",
            };

            assembler.fetch(quad.first.symbol(), Register::Rax);
            assembler.fetch(quad.second.symbol(), Register::Rcx);
            assembler.emit(format!("{instruction} rax, rcx"));
            assembler.store(Register::Rax, quad.third.symbol());
        }
        QuadOp::Idivide | QuadOp::Imod => {
            assembler.fetch(quad.first.symbol(), Register::Rax);
            assembler.fetch(quad.second.symbol(), Register::Rcx);
            assembler.emit("cqo");
            assembler.emit("idiv rcx");

            let result = if quad.op == QuadOp::Imod {
                Register::Rdx
            } else {
                Register::Rax
            };
            assembler.store(result, quad.third.symbol());
        }
        QuadOp::Ior => {
            let (is_true, done) = (assembler.next_label(), assembler.next_label());

            assembler.fetch(quad.first.symbol(), Register::Rax);
            assembler.emit("cmp rax, 0");
            assembler.emit(format!("jne {is_true}"));
            assembler.fetch(quad.second.symbol(), Register::Rax);
            assembler.emit("cmp rax, 0");
            assembler.emit(format!("jne {is_true}"));
            assembler.emit("mov rax, 0");
            assembler.emit(format!("jmp {done}"));
            assembler.local_label(is_true);
            assembler.emit("mov rax, 1");
            assembler.local_label(done);
            assembler.store(Register::Rax, quad.third.symbol());
        }
        QuadOp::Iand => {
            let (is_false, done) = (assembler.next_label(), assembler.next_label());

            assembler.fetch(quad.first.symbol(), Register::Rax);
            assembler.emit("cmp rax, 0");
            assembler.emit(format!("je {is_false}"));
            assembler.fetch(quad.second.symbol(), Register::Rax);
            assembler.emit("cmp rax, 0");
            assembler.emit(format!("je {is_false}"));
            assembler.emit("mov rax, 1");
            assembler.emit(format!("jmp {done}"));
            assembler.local_label(is_false);
            assembler.emit("mov rax, 0");
            assembler.local_label(done);
            assembler.store(Register::Rax, quad.third.symbol());
        }
        QuadOp::Ieq | QuadOp::Ine | QuadOp::Ilt | QuadOp::Igt => {
            let jump = match quad.op {
                QuadOp::Ieq => "je",
                QuadOp::Ine => "jne",
                QuadOp::Ilt => "jl",
                _ => "jg",
            };

            assembler.fetch(quad.first.symbol(), Register::Rax);
            assembler.fetch(quad.second.symbol(), Register::Rcx);
            assembler.emit("cmp rax, rcx");
            emit_boolean_result(assembler, jump, quad.third.symbol());
        }
        QuadOp::Req | QuadOp::Rne | QuadOp::Rlt | QuadOp::Rgt => {
            let jump = match quad.op {
                QuadOp::Req => "je",
                QuadOp::Rne => "jne",
                QuadOp::Rlt => "jb",
                _ => "ja",
            };

            // `fcomip` compares st(0) against st(1), so the ordered
            // comparisons push the right operand first
            if matches!(quad.op, QuadOp::Rlt | QuadOp::Rgt) {
                assembler.fetch_float(quad.second.symbol());
                assembler.fetch_float(quad.first.symbol());
            } else {
                assembler.fetch_float(quad.first.symbol());
                assembler.fetch_float(quad.second.symbol());
            }

            assembler.emit("fcomip ST(0), ST(1)");
            assembler.emit("fstp ST(0)");
            emit_boolean_result(assembler, jump, quad.third.symbol());
        }
        QuadOp::Rstore | QuadOp::Istore => {
            assembler.fetch(quad.first.symbol(), Register::Rax);
            assembler.fetch(quad.third.symbol(), Register::Rcx);
            assembler.emit("mov [rcx], rax");
        }
        QuadOp::Rassign | QuadOp::Iassign => {
            assembler.fetch(quad.first.symbol(), Register::Rax);
            assembler.store(Register::Rax, quad.third.symbol());
        }
        QuadOp::Param => {
            assembler.fetch(quad.first.symbol(), Register::Rax);
            assembler.emit("push rax");
        }
        QuadOp::Call => {
            let callee = quad.first.symbol();
            let label = assembler.symbols()[callee].callable().label;
            let name = assembler.symbols().name(callee);
            let arguments = quad.second.immediate();

            assembler.emit(format!("call {label}\t# {name}"));
            assembler.emit(format!("add rsp, {}", arguments * WORD_SIZE as i64));

            if let Operand::Symbol(destination) = quad.third {
                assembler.store(Register::Rax, destination);
            }
        }
        QuadOp::Rreturn | QuadOp::Ireturn => {
            assembler.fetch(quad.second.symbol(), Register::Rax);
            assembler.emit(format!("jmp {}", quad.first.label()));
        }
        QuadOp::Lindex | QuadOp::Rrindex | QuadOp::Irindex => {
            // Arrays grow towards lower addresses
            assembler.array_address(quad.first.symbol(), Register::Rax);
            assembler.fetch(quad.second.symbol(), Register::Rcx);
            assembler.emit(format!("imul rcx, {WORD_SIZE}"));
            assembler.emit("sub rax, rcx");

            if quad.op != QuadOp::Lindex {
                assembler.emit("mov rax, [rax]");
            }

            assembler.store(Register::Rax, quad.third.symbol());
        }
        QuadOp::Itor => {
            assembler.fetch_integer_as_float(quad.first.symbol());
            assembler.store_float(quad.third.symbol());
        }
        QuadOp::Jmp => {
            assembler.emit(format!("jmp {}", quad.first.label()));
        }
        QuadOp::Jmpf => {
            assembler.fetch(quad.second.symbol(), Register::Rax);
            assembler.emit("cmp rax, 0");
            assembler.emit(format!("je {}", quad.first.label()));
        }
        // Emitted before the trace comment
        QuadOp::Labl => {}
        QuadOp::Nop => panic!("nop quadruple reached code generation"),
    }
}

/// Materializes the outcome of the preceding comparison as 1 or 0 in `rax`
/// and stores it
fn emit_boolean_result(assembler: &mut Assembler, jump: &str, destination: SymbolId) {
    let (is_true, done) = (assembler.next_label(), assembler.next_label());

    assembler.emit(format!("{jump} {is_true}"));
    assembler.emit("mov rax, 0");
    assembler.emit(format!("jmp {done}"));
    assembler.local_label(is_true);
    assembler.emit("mov rax, 1");
    assembler.local_label(done);
    assembler.store(Register::Rax, destination);
}
